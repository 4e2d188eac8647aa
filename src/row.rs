//! The fixed row schema: `id: u32`, `username: [u8; 32]`, `email: [u8; 255]`.
//!
//! Field offsets inside the serialized 293-byte value area are fixed at
//! `{id: 0, username: 4, email: 37}`. Strings are stored left-justified and
//! zero-padded, leaving one reserved trailing NUL byte within the field.

use crate::errors::Error;

pub const MAX_USERNAME_LEN: usize = 32;
pub const MAX_EMAIL_LEN: usize = 255;

const ID_SIZE: usize = 4;
const USERNAME_SIZE: usize = MAX_USERNAME_LEN + 1;
const EMAIL_SIZE: usize = MAX_EMAIL_LEN + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self, Error> {
        let username = username.into();
        let email = email.into();
        if username.len() > MAX_USERNAME_LEN {
            return Err(Error::Parse("String is too long.".into()));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(Error::Parse("String is too long.".into()));
        }
        Ok(Row { id, username, email })
    }

    pub fn serialize(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        let uname = self.username.as_bytes();
        buf[USERNAME_OFFSET..USERNAME_OFFSET + uname.len()].copy_from_slice(uname);
        let email = self.email.as_bytes();
        buf[EMAIL_OFFSET..EMAIL_OFFSET + email.len()].copy_from_slice(email);
        buf
    }

    pub fn deserialize(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), ROW_SIZE);
        let id = u32::from_le_bytes(bytes[ID_OFFSET..ID_OFFSET + ID_SIZE].try_into().unwrap());
        let username = read_cstr(&bytes[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let email = read_cstr(&bytes[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Row { id, username, email }
    }
}

fn read_cstr(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let row = Row::new(1, "alice", "a@x").unwrap();
        let bytes = row.serialize();
        let back = Row::deserialize(&bytes);
        assert_eq!(row, back);
    }

    #[test]
    fn rejects_oversized_fields() {
        let long_name = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(Row::new(1, long_name, "a@x").is_err());
        let long_email = "a".repeat(MAX_EMAIL_LEN + 1);
        assert!(Row::new(1, "alice", long_email).is_err());
    }

    #[test]
    fn size_matches_design() {
        assert_eq!(ROW_SIZE, 293);
    }
}
