// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod pool_test;
pub mod registry_test;
pub mod url_resolver_test;
