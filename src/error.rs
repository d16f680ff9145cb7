// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all statwt-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatWtError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ConfigError),

    #[error("{0}")]
    Source(#[from] crate::source::SourceError),
}
