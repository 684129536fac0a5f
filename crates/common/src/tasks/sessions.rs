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

use std::sync::{PoisonError, RwLock};

use muckr_var::Obj;
use thiserror::Error;

/// The interface for the user I/O side of the server, as seen by the MPI interpreter.
///
/// Implementations live in the host: the network layer for a running server, a terminal for the
/// command line evaluator, or a recording mock in tests.
///
/// A player may be connected more than once. Connection times reported here are those of the
/// player's *least idle* connection, which is the one MPI reports on.
pub trait Session: Send + Sync {
    /// Send one line of output to `target`. For players this is their connections; for other
    /// objects it is whatever listens through them, if anything.
    fn notify(&self, target: Obj, msg: &str) -> Result<(), SessionError>;

    /// Return the list of currently-connected players, most recently connected first.
    fn connected_players(&self) -> Result<Vec<Obj>, SessionError>;

    /// Return how many seconds the given player has been connected.
    fn connected_seconds(&self, player: Obj) -> Result<f64, SessionError>;

    /// Return how many seconds the given player has been idle.
    fn idle_seconds(&self, player: Obj) -> Result<f64, SessionError>;

    /// Number of open connections for the given player; zero when not connected.
    fn connection_count(&self, player: Obj) -> Result<usize, SessionError>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No connection for player {0}")]
    NoConnectionForPlayer(Obj),
    #[error("Could not deliver session message")]
    DeliveryError,
}

/// A simple no-op implementation of the Sessions trait, for use in unit tests.
/// No output, and pretends no players are connected.
#[derive(Default)]
pub struct NoopClientSession {}

impl NoopClientSession {
    pub fn new() -> Self {
        NoopClientSession {}
    }
}

impl Session for NoopClientSession {
    fn notify(&self, _target: Obj, _msg: &str) -> Result<(), SessionError> {
        Ok(())
    }

    fn connected_players(&self) -> Result<Vec<Obj>, SessionError> {
        Ok(vec![])
    }

    fn connected_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        Err(SessionError::NoConnectionForPlayer(player))
    }

    fn idle_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        Err(SessionError::NoConnectionForPlayer(player))
    }

    fn connection_count(&self, _player: Obj) -> Result<usize, SessionError> {
        Ok(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct MockConnection {
    connected_seconds: f64,
    idle_seconds: f64,
}

#[derive(Default)]
struct Inner {
    received: Vec<(Obj, String)>,
    connections: Vec<(Obj, MockConnection)>,
}

/// A 'mock' client session which collects output that tests can use to verify it, and lets
/// tests pretend players are connected.
#[derive(Default)]
pub struct MockClientSession {
    inner: RwLock<Inner>,
}

impl MockClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `player` has a connection open with the given times.
    pub fn connect(&self, player: Obj, connected_seconds: f64, idle_seconds: f64) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.connections.push((
            player,
            MockConnection {
                connected_seconds,
                idle_seconds,
            },
        ));
    }

    /// Every notification delivered, in order.
    pub fn received(&self) -> Vec<(Obj, String)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.received.clone()
    }

    /// The lines delivered to one target, in order.
    pub fn received_by(&self, target: Obj) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .received
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn least_idle(&self, player: Obj) -> Option<MockConnection> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .connections
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, c)| *c)
            .min_by(|a, b| a.idle_seconds.total_cmp(&b.idle_seconds))
    }
}

impl Session for MockClientSession {
    fn notify(&self, target: Obj, msg: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.received.push((target, msg.to_string()));
        Ok(())
    }

    fn connected_players(&self) -> Result<Vec<Obj>, SessionError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut players: Vec<Obj> = vec![];
        for (p, _) in inner.connections.iter().rev() {
            if !players.contains(p) {
                players.push(*p);
            }
        }
        Ok(players)
    }

    fn connected_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        self.least_idle(player)
            .map(|c| c.connected_seconds)
            .ok_or(SessionError::NoConnectionForPlayer(player))
    }

    fn idle_seconds(&self, player: Obj) -> Result<f64, SessionError> {
        self.least_idle(player)
            .map(|c| c.idle_seconds)
            .ok_or(SessionError::NoConnectionForPlayer(player))
    }

    fn connection_count(&self, player: Obj) -> Result<usize, SessionError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.connections.iter().filter(|(p, _)| *p == player).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mock_session_records_and_reports() {
        let session = MockClientSession::new();
        let alice = Obj::mk_id(3);
        let bob = Obj::mk_id(4);

        session.connect(alice, 100.0, 30.0);
        session.connect(alice, 20.0, 5.0);
        session.connect(bob, 50.0, 50.0);

        session.notify(alice, "hello").unwrap();
        session.notify(bob, "hi").unwrap();

        assert_eq!(session.received_by(alice), vec!["hello".to_string()]);
        assert_eq!(session.connection_count(alice).unwrap(), 2);
        // The least idle connection is the one reported.
        assert_eq!(session.connected_seconds(alice).unwrap(), 20.0);
        assert_eq!(session.idle_seconds(alice).unwrap(), 5.0);
        assert_eq!(session.connected_players().unwrap(), vec![bob, alice]);
        assert!(session.idle_seconds(Obj::mk_id(99)).is_err());
    }
}
