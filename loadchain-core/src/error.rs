// Copyright 2025 Loadchain Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hook error types

use thiserror::Error;

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Errors produced by hook implementations or host defaults.
///
/// The engine never creates, catches, or retries these: a failing chain link
/// propagates unchanged to the facade caller and becomes the operation's
/// failure as seen by the host.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("cannot resolve `{specifier}`: {reason}")]
    Resolve { specifier: String, reason: String },

    #[error("cannot load `{url}`: {reason}")]
    Load { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Create a resolve failure for a specifier.
    pub fn resolve(specifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolve {
            specifier: specifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a load failure for a URL.
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
