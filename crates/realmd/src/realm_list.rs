// Realm registry: an immutable snapshot of the configured realms, taken once
// at startup from the `[world1]`, `[world2]`, ... config sections. Unlike the
// original database-backed list this is never refreshed at runtime; adding or
// removing a realm means editing the config file and restarting the process.

use realm_shared::config::Config;
use realm_shared::util::ByteBuffer;

/// A single advertised realm, as handed back by RS_CLIENT_REALM_LIST.
#[derive(Debug, Clone)]
pub struct RealmRecord {
    pub id: u32,
    pub realm_type: u8,
    pub is_locked: bool,
    pub color: u8,
    pub name: String,
    pub address: String,
    pub game_port: u16,
    pub comm_port: u16,
    pub population: f32,
    pub characters_count: u8,
    pub timezone: u8,
}

impl RealmRecord {
    fn socket_address(&self) -> String {
        format!("{}:{}", self.address, self.game_port)
    }
}

/// The realm registry snapshot. Built once at startup and shared read-only
/// for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RealmList {
    realms: Vec<RealmRecord>,
}

impl RealmList {
    /// Reads every `[world*]` section and turns it into a `RealmRecord`.
    /// Sections are read in sorted-name order, so `world1` is always realm
    /// id 1, `world2` realm id 2, and so on.
    pub fn from_config(config: &Config) -> RealmList {
        let mut realms = Vec::new();
        for (index, section) in config.section_names_with_prefix("world").iter().enumerate() {
            let id = (index + 1) as u32;
            let realm_type = config.get_int_default(section, "type", 1) as u8;
            let is_locked = config.get_bool_default(section, "isLocked", false);
            let color = config.get_int_default(section, "color", 0) as u8;
            let name = config.get_string_default(section, "name", section);
            let address = config.get_string_default(section, "address", "127.0.0.1");
            let game_port = config.get_int_default(section, "game_port", 8085) as u16;
            let comm_port = config.get_int_default(section, "comm_port", 8086) as u16;
            let population = config.get_float_default(section, "population", 0.0);
            let characters_count = config.get_int_default(section, "characters_count", 0) as u8;
            let timezone = config.get_int_default(section, "timezone", 1) as u8;

            tracing::info!(
                "Loaded realm id {} ('{}') at {}:{}, comm port {}",
                id, name, address, game_port, comm_port
            );

            realms.push(RealmRecord {
                id,
                realm_type,
                is_locked,
                color,
                name,
                address,
                game_port,
                comm_port,
                population,
                characters_count,
                timezone,
            });
        }
        RealmList { realms }
    }

    pub fn realms(&self) -> &[RealmRecord] {
        &self.realms
    }

    pub fn len(&self) -> usize {
        self.realms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realms.is_empty()
    }

    /// Encodes the RS_SERVER_REALM_LIST reply body, including the leading
    /// `cmd` byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = ByteBuffer::new();
        body.write_u32(0); // unk
        body.write_u16(self.realms.len() as u16);
        for realm in &self.realms {
            body.write_u8(realm.realm_type);
            body.write_u8(realm.is_locked as u8);
            body.write_u8(0); // unk
            body.write_u8(realm.color);
            body.write_string(&realm.name);
            body.write_string(&realm.socket_address());
            body.write_f32(realm.population);
            body.write_u8(realm.characters_count);
            body.write_u8(realm.timezone);
            body.write_u8(0); // unk
        }
        body.write_u8(0x02);
        body.write_u8(0x00);

        let body_bytes = body.contents();
        let mut out = ByteBuffer::with_capacity(body_bytes.len() + 3);
        out.write_u8(0x10); // cmd
        out.write_u16(body_bytes.len() as u16);
        out.append(body_bytes);
        out.contents().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_empty_registry() {
        let config = Config::new();
        let list = RealmList::from_config(&config);
        assert!(list.is_empty());
    }

    #[test]
    fn encode_of_empty_registry_has_zero_realms_and_trailer() {
        let list = RealmList { realms: Vec::new() };
        let bytes = list.encode();
        assert_eq!(bytes[0], 0x10);
        let size = u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
        assert_eq!(bytes.len(), 3 + size);
        // unk(4) + num_realms(2) + trailer(2) = 8
        assert_eq!(size, 8);
        assert_eq!(&bytes[bytes.len() - 2..], &[0x02, 0x00]);
    }

    #[test]
    fn encode_includes_realm_fields_in_order() {
        let realm = RealmRecord {
            id: 1,
            realm_type: 1,
            is_locked: false,
            color: 2,
            name: "Nordrassil".to_string(),
            address: "10.0.0.5".to_string(),
            game_port: 8085,
            comm_port: 8086,
            population: 1.5,
            characters_count: 3,
            timezone: 1,
        };
        let list = RealmList {
            realms: vec![realm],
        };
        let bytes = list.encode();
        let name_needle = b"Nordrassil\0";
        assert!(bytes.windows(name_needle.len()).any(|w| w == name_needle));
        let address_needle = b"10.0.0.5:8085\0";
        assert!(bytes
            .windows(address_needle.len())
            .any(|w| w == address_needle));
    }
}
