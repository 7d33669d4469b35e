// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::io;
use std::path::PathBuf;

use failure::Fail;

/// An error produced while executing an action or maintaining the digest
/// cache. A failed build reports one of these per failed node.
#[derive(Debug, Fail)]
pub enum Error {
    /// An underlying I/O failure.
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),

    /// A subprocess exited unsuccessfully.
    #[fail(display = "command `{}` exited with code {}", command, code)]
    CommandFailed { command: String, code: i32 },

    /// An action could not find a required input among its predecessors.
    #[fail(display = "no {} found among the inputs", what)]
    MissingInput { what: &'static str },

    /// An action could not find a required output among its successors.
    #[fail(display = "no {} found among the outputs", what)]
    MissingOutput { what: &'static str },

    /// The digest cache could not be serialized.
    #[fail(display = "failed to serialize digest cache {:?}: {}", path, cause)]
    CacheWrite {
        path: PathBuf,
        #[cause]
        cause: serde_json::Error,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::Io(err.error)
    }
}
