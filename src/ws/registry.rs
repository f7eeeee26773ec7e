use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::{ConnectionId, Participant};

/// Tracks live connections, their usernames and the rooms they joined.
///
/// Rooms have no lifecycle of their own: an entry is created by the first
/// join and dropped as soon as its last member leaves.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashSet<ConnectionId>,
    usernames: HashMap<ConnectionId, Option<String>>,
    // Members kept in join order
    rooms: HashMap<String, Vec<ConnectionId>>,
    memberships: HashMap<ConnectionId, Vec<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an identifier for a freshly opened connection
    pub fn connect(&mut self) -> ConnectionId {
        let connection = ConnectionId::new();
        self.connections.insert(connection.clone());
        debug!("Registered connection {}", connection);
        connection
    }

    pub fn is_connected(&self, connection: &ConnectionId) -> bool {
        self.connections.contains(connection)
    }

    /// Record the username and add the connection to the room.
    /// Returns the room's participant list after the join.
    pub fn join(&mut self, connection: &ConnectionId, room_id: &str, username: Option<String>) -> Vec<Participant> {
        self.connections.insert(connection.clone());
        self.usernames.insert(connection.clone(), username);

        let members = self.rooms.entry(room_id.to_string()).or_default();
        if !members.contains(connection) {
            members.push(connection.clone());
        }

        let rooms = self.memberships.entry(connection.clone()).or_default();
        if !rooms.iter().any(|room| room == room_id) {
            rooms.push(room_id.to_string());
        }

        self.participants(room_id)
    }

    /// Remove the connection everywhere. Returns, per room it was in, the
    /// room id and the members left behind, plus the last known username.
    pub fn disconnect(&mut self, connection: &ConnectionId) -> (Vec<(String, Vec<ConnectionId>)>, Option<String>) {
        let mut left = Vec::new();
        for room_id in self.memberships.remove(connection).unwrap_or_default() {
            let remaining = match self.rooms.get_mut(&room_id) {
                Some(members) => {
                    members.retain(|member| member != connection);
                    members.clone()
                }
                None => Vec::new(),
            };
            if remaining.is_empty() {
                self.rooms.remove(&room_id);
                debug!("Room {} is empty and was removed", room_id);
            }
            left.push((room_id, remaining));
        }

        self.connections.remove(connection);
        let username = self.usernames.remove(connection).flatten();
        (left, username)
    }

    pub fn members(&self, room_id: &str) -> &[ConnectionId] {
        self.rooms.get(room_id).map(|members| members.as_slice()).unwrap_or(&[])
    }

    pub fn participants(&self, room_id: &str) -> Vec<Participant> {
        self.members(room_id)
            .iter()
            .map(|connection| Participant {
                connection_id: connection.clone(),
                username: self.username(connection),
            })
            .collect()
    }

    pub fn username(&self, connection: &ConnectionId) -> Option<String> {
        self.usernames.get(connection).cloned().flatten()
    }

    pub fn rooms_of(&self, connection: &ConnectionId) -> &[String] {
        self.memberships.get(connection).map(|rooms| rooms.as_slice()).unwrap_or(&[])
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.rooms.values().map(|members| members.len()).sum()
    }
}
