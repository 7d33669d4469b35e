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

use std::path::Path;
use std::process;

use log::info;

use crate::error::Error;

/// Runs a command line through the system shell, optionally in the given
/// working directory. Exit status 0 is success; anything else is an error
/// carrying the exit code.
pub fn shell(command: &str, cwd: Option<&Path>) -> Result<(), Error> {
    info!("{}", command);

    let mut cmd = shell_command();
    cmd.arg(command);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let status = cmd.status()?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            command: command.to_string(),
            code: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(unix)]
fn shell_command() -> process::Command {
    let mut cmd = process::Command::new("/bin/sh");
    cmd.arg("-c");
    cmd
}

#[cfg(windows)]
fn shell_command() -> process::Command {
    let mut cmd = process::Command::new("cmd.exe");
    cmd.arg("/C");
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn exit_codes() {
        assert!(shell("exit 0", None).is_ok());

        match shell("exit 3", None) {
            Err(Error::CommandFailed { code, .. }) => assert_eq!(code, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn working_directory() {
        let dir = tempfile::tempdir().unwrap();
        shell("echo hi > marker.txt", Some(dir.path())).unwrap();
        assert!(dir.path().join("marker.txt").exists());
    }
}
