// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{io, thread};

use crossbeam_channel::Sender;
use tracing::{error, info, span, warn, Level};

const STATUS: &str = "status";
const QUIT: &str = "quit";

/// Something the operator asked for at the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Status,
    Quit,
}

/// Reads one line and forwards the request it names. Returns false once input is exhausted or
/// nobody is listening anymore.
fn monitor_io<R, W>(requests: &Sender<Request>, mut reader: R, mut writer: W) -> io::Result<bool>
where
    R: io::BufRead,
    W: io::Write,
{
    write!(writer, "Command ({}, {}): ", STATUS, QUIT)?;
    writer.flush()?;

    let mut input = String::default();
    if reader.read_line(&mut input)? == 0 {
        return Ok(false);
    }

    let request = match input.trim().to_lowercase().as_str() {
        STATUS => Request::Status,
        QUIT => Request::Quit,
        "" => return Ok(true),
        _ => {
            warn!(input = input.trim(), "Unrecognized input");
            return Ok(true);
        }
    };
    Ok(requests.send(request).is_ok())
}

/// Reads requests from stdin on a detached thread. The thread ends on end of input or when the
/// receiving side is dropped.
pub fn start(requests: Sender<Request>) -> io::Result<()> {
    thread::Builder::new()
        .name("operator".to_string())
        .spawn(move || {
            let span = span!(Level::INFO, "operator");
            let _enter = span.enter();

            info!("Operator console started");
            loop {
                match monitor_io(&requests, io::stdin().lock(), io::stdout()) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        error!(err = e.to_string(), "Error reading operator input");
                        break;
                    }
                }
            }
            info!("Operator console closed");
        })?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::{BufReader, Cursor};

    use crossbeam_channel::bounded;

    use super::*;

    fn request(line: &str) -> Result<(bool, Option<Request>), io::Error> {
        let (sender, receiver) = bounded::<Request>(1);
        let mut prompt = Vec::new();
        let more = monitor_io(&sender, BufReader::new(line.as_bytes()), &mut prompt)?;
        assert!(String::from_utf8_lossy(&prompt).contains("status"));
        Ok((more, receiver.try_recv().ok()))
    }

    #[test]
    fn test_requests() -> Result<(), io::Error> {
        assert_eq!(request("status\n")?, (true, Some(Request::Status)));
        assert_eq!(request("  QUIT \n")?, (true, Some(Request::Quit)));
        assert_eq!(request("dance\n")?, (true, None));
        assert_eq!(request("\n")?, (true, None));
        assert_eq!(request("")?, (false, None));
        Ok(())
    }

    #[test]
    fn test_stops_when_nobody_listens() -> Result<(), io::Error> {
        let (sender, receiver) = bounded::<Request>(1);
        drop(receiver);
        let more = monitor_io(&sender, Cursor::new("quit\n"), io::sink())?;
        assert!(!more);
        Ok(())
    }
}
