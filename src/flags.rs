//! Wireless Extensions constant tables.
//!
//! Opcode numbers, bitmask values, and structure capacity limits, sourced
//! from `linux/wireless.h`. These must stay bit-exact with the kernel: the
//! ioctl exchange is a binary handshake, not a textual protocol.

// Wireless ioctl opcodes
pub const SIOCSIWCOMMIT: u32 = 0x8B00;
pub const SIOCGIWNAME: u32 = 0x8B01;
pub const SIOCSIWNWID: u32 = 0x8B02;
pub const SIOCGIWNWID: u32 = 0x8B03;
pub const SIOCSIWFREQ: u32 = 0x8B04;
pub const SIOCGIWFREQ: u32 = 0x8B05;
pub const SIOCSIWMODE: u32 = 0x8B06;
pub const SIOCGIWMODE: u32 = 0x8B07;
pub const SIOCSIWSENS: u32 = 0x8B08;
pub const SIOCGIWSENS: u32 = 0x8B09;
pub const SIOCSIWRANGE: u32 = 0x8B0A;
pub const SIOCGIWRANGE: u32 = 0x8B0B;
pub const SIOCSIWSTATS: u32 = 0x8B0E;
pub const SIOCGIWSTATS: u32 = 0x8B0F;
pub const SIOCSIWAP: u32 = 0x8B14;
pub const SIOCGIWAP: u32 = 0x8B15;
pub const SIOCSIWSCAN: u32 = 0x8B18;
pub const SIOCGIWSCAN: u32 = 0x8B19;
pub const SIOCSIWESSID: u32 = 0x8B1A;
pub const SIOCGIWESSID: u32 = 0x8B1B;
pub const SIOCSIWNICKN: u32 = 0x8B1C;
pub const SIOCGIWNICKN: u32 = 0x8B1D;
pub const SIOCSIWRATE: u32 = 0x8B20;
pub const SIOCGIWRATE: u32 = 0x8B21;
pub const SIOCSIWRTS: u32 = 0x8B22;
pub const SIOCGIWRTS: u32 = 0x8B23;
pub const SIOCSIWFRAG: u32 = 0x8B24;
pub const SIOCGIWFRAG: u32 = 0x8B25;
pub const SIOCSIWTXPOW: u32 = 0x8B26;
pub const SIOCGIWTXPOW: u32 = 0x8B27;
pub const SIOCSIWRETRY: u32 = 0x8B28;
pub const SIOCGIWRETRY: u32 = 0x8B29;
pub const SIOCSIWENCODE: u32 = 0x8B2A;
pub const SIOCGIWENCODE: u32 = 0x8B2B;
pub const SIOCSIWPOWER: u32 = 0x8B2C;
pub const SIOCGIWPOWER: u32 = 0x8B2D;

// Wireless event codes (scan result stream only emits a subset)
pub const IWEVTXDROP: u32 = 0x8C00;
pub const IWEVQUAL: u32 = 0x8C01;
pub const IWEVCUSTOM: u32 = 0x8C02;
pub const IWEVREGISTERED: u32 = 0x8C03;
pub const IWEVEXPIRED: u32 = 0x8C04;
pub const IWEVGENIE: u32 = 0x8C05;

// Structure capacities
pub const IFNAMSIZ: usize = 16;
pub const IW_ESSID_MAX_SIZE: usize = 32;
pub const IW_ENCODING_TOKEN_MAX: usize = 64;
pub const IW_MAX_BITRATES: usize = 32;
pub const IW_MAX_FREQUENCIES: usize = 32;
pub const IW_MAX_ENCODING_SIZES: usize = 8;
pub const IW_MAX_TXPOWER: usize = 8;
pub const IW_SCAN_MAX_DATA: usize = 4096;

// Operating modes
pub const IW_MODE_AUTO: u32 = 0;
pub const IW_MODE_ADHOC: u32 = 1;
pub const IW_MODE_INFRA: u32 = 2;
pub const IW_MODE_MASTER: u32 = 3;
pub const IW_MODE_REPEAT: u32 = 4;
pub const IW_MODE_SECOND: u32 = 5;
pub const IW_MODE_MONITOR: u32 = 6;
pub const IW_MODE_MESH: u32 = 7;

// Frequency flags
pub const IW_FREQ_AUTO: u8 = 0x00;
pub const IW_FREQ_FIXED: u8 = 0x01;

// Encoding (key) flags, in the iw_point flags word
pub const IW_ENCODE_INDEX: u16 = 0x00FF;
pub const IW_ENCODE_FLAGS: u16 = 0xFF00;
pub const IW_ENCODE_MODE: u16 = 0xF000;
pub const IW_ENCODE_DISABLED: u16 = 0x8000;
pub const IW_ENCODE_ENABLED: u16 = 0x0000;
pub const IW_ENCODE_RESTRICTED: u16 = 0x4000;
pub const IW_ENCODE_OPEN: u16 = 0x2000;
pub const IW_ENCODE_NOKEY: u16 = 0x0800;
pub const IW_ENCODE_TEMP: u16 = 0x0400;

// Retry limit/lifetime flags, in the iw_param flags word
pub const IW_RETRY_ON: u16 = 0x0000;
pub const IW_RETRY_TYPE: u16 = 0xF000;
pub const IW_RETRY_LIMIT: u16 = 0x1000;
pub const IW_RETRY_LIFETIME: u16 = 0x2000;
pub const IW_RETRY_MODIFIER: u16 = 0x00FF;
pub const IW_RETRY_MIN: u16 = 0x0001;
pub const IW_RETRY_MAX: u16 = 0x0002;
pub const IW_RETRY_RELATIVE: u16 = 0x0004;
pub const IW_RETRY_SHORT: u16 = 0x0010;
pub const IW_RETRY_LONG: u16 = 0x0020;

// Power management flags, in the iw_param flags word
pub const IW_POWER_ON: u16 = 0x0000;
pub const IW_POWER_TYPE: u16 = 0xF000;
pub const IW_POWER_PERIOD: u16 = 0x1000;
pub const IW_POWER_TIMEOUT: u16 = 0x2000;
pub const IW_POWER_SAVING: u16 = 0x4000;
pub const IW_POWER_MODE: u16 = 0x0F00;
pub const IW_POWER_UNICAST_R: u16 = 0x0100;
pub const IW_POWER_MULTICAST_R: u16 = 0x0200;
pub const IW_POWER_ALL_R: u16 = 0x0300;
pub const IW_POWER_FORCE_S: u16 = 0x0400;
pub const IW_POWER_REPEATER: u16 = 0x0800;
pub const IW_POWER_MODIFIER: u16 = 0x000F;
pub const IW_POWER_MIN: u16 = 0x0001;
pub const IW_POWER_MAX: u16 = 0x0002;
pub const IW_POWER_RELATIVE: u16 = 0x0004;

// TX power units, in the iw_param flags word
pub const IW_TXPOW_TYPE: u16 = 0x00FF;
pub const IW_TXPOW_DBM: u16 = 0x0000;
pub const IW_TXPOW_MWATT: u16 = 0x0001;
pub const IW_TXPOW_RELATIVE: u16 = 0x0002;

// Quality "updated" byte
pub const IW_QUAL_QUAL_UPDATED: u8 = 0x01;
pub const IW_QUAL_LEVEL_UPDATED: u8 = 0x02;
pub const IW_QUAL_NOISE_UPDATED: u8 = 0x04;
pub const IW_QUAL_ALL_UPDATED: u8 = 0x07;
pub const IW_QUAL_DBM: u8 = 0x08;
pub const IW_QUAL_QUAL_INVALID: u8 = 0x10;
pub const IW_QUAL_LEVEL_INVALID: u8 = 0x20;
pub const IW_QUAL_NOISE_INVALID: u8 = 0x40;
pub const IW_QUAL_RCPI: u8 = 0x80;

// Scan request flags
pub const IW_SCAN_DEFAULT: u16 = 0x0000;
pub const IW_SCAN_ALL_ESSID: u16 = 0x0001;
pub const IW_SCAN_THIS_ESSID: u16 = 0x0002;

/// Extract the key index from an encoding flags word.
///
/// Index values 0 and 1 denote the current/unspecified key by convention and
/// decode to `None`; only values greater than 1 name an explicit key slot.
pub fn key_index(flags: u16) -> Option<u8> {
    let index = (flags & IW_ENCODE_INDEX) as u8;
    (index > 1).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_index_full_masked_range() {
        assert_eq!(key_index(0x0000), None);
        assert_eq!(key_index(0x0001), None);
        for raw in 2..=0xFFu16 {
            // High flag bits must not leak into the index field.
            assert_eq!(key_index(raw | IW_ENCODE_DISABLED), Some(raw as u8));
            assert_eq!(key_index(raw), Some(raw as u8));
        }
    }

    #[test]
    fn power_mode_values_compose() {
        assert_eq!(IW_POWER_ALL_R, IW_POWER_UNICAST_R | IW_POWER_MULTICAST_R);
        assert_eq!(IW_POWER_MODE & IW_POWER_TYPE, 0);
        assert_eq!(IW_RETRY_LIMIT & IW_RETRY_MODIFIER, 0);
    }
}
