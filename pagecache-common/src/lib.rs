// Copyright 2026 pagecache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared components for pagecache.

/// Allow enable debug assertions in release profile with feature "strict_assertions".
pub mod assert;
/// Traits for key and value, and the default hash builder.
pub mod code;
/// The error type and result alias used across the workspace.
pub mod error;
/// Hashers for tests and sharding experiments.
pub mod hasher;
/// Per-domain memory accounting scopes.
pub mod mem_tracker;
/// Metrics model and registries.
pub mod metrics;
/// Entry level properties.
pub mod properties;
/// Scoped functional programming extensions.
pub mod scope;
