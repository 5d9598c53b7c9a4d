// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;

use thiserror::Error;

use crate::NoteNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("disconnected")]
    Disconnected,
    #[error("send: {msg}")]
    Send { msg: Cow<'static, str> },
    #[error(transparent)]
    InvalidNote(#[from] NoteNameError),
}

pub type Result<T> = std::result::Result<T, Error>;
