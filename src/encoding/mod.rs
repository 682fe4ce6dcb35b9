// Copyright 2025 Dustin McAfee
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

//! Encoders for the produced binary streams.
//!
//! This module provides the RLEI codec and the framed serializations
//! built on top of the screen builder's state.

pub mod nametable;
pub mod oam;
pub mod rlei;

// Re-export the main entry points.
pub use nametable::compress_nametable;
pub use oam::{compress_oam, oam};
pub use rlei::compress as rlei_compress;
