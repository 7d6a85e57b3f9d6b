//! Fluent builders for directory entries used in tests.

use group_sync_builders::Entry;

/// Builder for group entries under `ou=groups,dc=example,dc=com`
#[derive(Debug, Clone)]
pub struct GroupEntryBuilder {
    entry: Entry,
}

impl GroupEntryBuilder {
    /// A posixGroup named `cn`
    pub fn posix(cn: &str) -> Self {
        Self {
            entry: Entry::new(format!("cn={},ou=groups,dc=example,dc=com", cn))
                .with_attribute("objectClass", ["posixGroup"])
                .with_attribute("cn", [cn]),
        }
    }

    /// A posixGroup whose entry carries no `cn` attribute
    pub fn posix_without_cn(rdn_value: &str) -> Self {
        Self {
            entry: Entry::new(format!("cn={},ou=groups,dc=example,dc=com", rdn_value))
                .with_attribute("objectClass", ["posixGroup"]),
        }
    }

    pub fn gid(mut self, gid: u32) -> Self {
        self.entry.set_attribute("gidNumber", [gid.to_string()]);
        self
    }

    pub fn member_uids<'a>(mut self, uids: impl IntoIterator<Item = &'a str>) -> Self {
        self.entry.set_attribute("memberUid", uids);
        self
    }

    pub fn build(self) -> Entry {
        self.entry
    }
}

/// Builder for user entries under `ou=users,dc=example,dc=com`
#[derive(Debug, Clone)]
pub struct UserEntryBuilder {
    entry: Entry,
}

impl UserEntryBuilder {
    pub fn new(uid: &str) -> Self {
        Self {
            entry: Entry::new(format!("uid={},ou=users,dc=example,dc=com", uid))
                .with_attribute("objectClass", ["inetOrgPerson"])
                .with_attribute("uid", [uid]),
        }
    }

    pub fn mail(mut self, mail: &str) -> Self {
        self.entry.set_attribute("mail", [mail]);
        self
    }

    pub fn build(self) -> Entry {
        self.entry
    }
}
