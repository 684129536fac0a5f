// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A `Session` for a single player sitting at the terminal.

use std::io::Write;
use std::sync::Mutex;

use minstant::Instant;
use muckr_common::tasks::{Session, SessionError};
use muckr_var::Obj;

/// Writes every notification to the wrapped writer, prefixed by its target when that isn't the
/// player at the console. The console player counts as connected since the session was made,
/// and never idle.
pub struct ConsoleSession<W: Write + Send> {
    player: Obj,
    started: Instant,
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleSession<W> {
    pub fn new(player: Obj, out: W) -> Self {
        Self {
            player,
            started: Instant::now(),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn connection(&self, player: Obj) -> Result<(), SessionError> {
        if player == self.player {
            Ok(())
        } else {
            Err(SessionError::NoConnectionForPlayer(player))
        }
    }
}

impl<W: Write + Send> Session for ConsoleSession<W> {
    fn notify(&self, target: Obj, msg: &str) -> Result<(), SessionError> {
        let mut out = self.out.lock().map_err(|_| SessionError::DeliveryError)?;
        let written = if target == self.player {
            writeln!(out, "{msg}")
        } else {
            writeln!(out, "[{target}] {msg}")
        };
        written.map_err(|_| SessionError::DeliveryError)
    }

    fn connected_players(&self) -> Result<Vec<Obj>, SessionError> {
        Ok(vec![self.player])
    }

    fn connected_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        self.connection(player)?;
        Ok(self.started.elapsed().as_secs_f64())
    }

    fn idle_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        self.connection(player)?;
        Ok(0.0)
    }

    fn connection_count(&self, player: Obj) -> Result<usize, SessionError> {
        Ok(usize::from(player == self.player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notify_prefixes_other_targets() {
        let me = Obj::mk_id(3);
        let session = ConsoleSession::new(me, Vec::new());
        session.notify(me, "hello").unwrap();
        session.notify(Obj::mk_id(4), "psst").unwrap();
        let out = String::from_utf8(session.into_inner()).unwrap();
        assert_eq!(out, "hello\n[#4] psst\n");
    }

    #[test]
    fn test_only_console_player_connected() {
        let me = Obj::mk_id(3);
        let session = ConsoleSession::new(me, Vec::new());
        assert_eq!(session.connected_players().unwrap(), vec![me]);
        assert_eq!(session.connection_count(Obj::mk_id(4)).unwrap(), 0);
        assert!(session.idle_seconds(Obj::mk_id(4)).is_err());
        assert_eq!(session.idle_seconds(me).unwrap(), 0.0);
    }
}
