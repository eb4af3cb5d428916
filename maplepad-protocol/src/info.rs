//! Device information block
//!
//! Byte layout (packed into words most significant byte first):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | function mask |
//! | 4 | 12 | three function definition words, highest function bit first |
//! | 16 | 1 | area code |
//! | 17 | 1 | connector direction |
//! | 18 | 30 | product name, space padded |
//! | 48 | 60 | license string, space padded |
//! | 108 | 2 | standby current, 0.1 mA |
//! | 110 | 2 | maximum current, 0.1 mA |
//! | 112 | 80 | version string (extended info only) |

use crate::frame::pack_words;

/// Words in a device info response
pub const DEVICE_INFO_WORDS: usize = 28;

/// Words in an extended device info response
pub const EXT_DEVICE_INFO_WORDS: usize = 48;

/// Product name field width
pub const NAME_LEN: usize = 30;

/// License field width
pub const LICENSE_LEN: usize = 60;

/// Version field width
pub const VERSION_LEN: usize = 80;

/// Function definition slots in the info block
pub const DEFINITION_SLOTS: usize = 3;

/// License text every first-party peripheral reports
pub const LICENSE: &str = "Produced By or Under License From SEGA ENTERPRISES,LTD.";

const INFO_BYTES: usize = DEVICE_INFO_WORDS * 4;
const EXT_INFO_BYTES: usize = EXT_DEVICE_INFO_WORDS * 4;

/// Identity a peripheral reports to the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo<'a> {
    /// OR of all function codes
    pub functions: u32,
    /// Definition words, highest function bit first, unused slots zero
    pub definitions: [u32; DEFINITION_SLOTS],
    pub area_code: u8,
    pub direction: u8,
    pub name: &'a str,
    pub version: &'a str,
    /// Standby current in 0.1 mA
    pub standby_current: u16,
    /// Maximum current in 0.1 mA
    pub max_current: u16,
}

impl DeviceInfo<'_> {
    /// Encode the 28-word device info payload
    pub fn encode(&self) -> [u32; DEVICE_INFO_WORDS] {
        let mut bytes = [0u8; INFO_BYTES];
        self.write_info(&mut bytes);

        let mut words = [0u32; DEVICE_INFO_WORDS];
        pack_words(&bytes, &mut words);
        words
    }

    /// Encode the 48-word extended device info payload
    pub fn encode_extended(&self) -> [u32; EXT_DEVICE_INFO_WORDS] {
        let mut bytes = [0u8; EXT_INFO_BYTES];
        self.write_info(&mut bytes[..INFO_BYTES]);
        copy_padded(&mut bytes[INFO_BYTES..], self.version);

        let mut words = [0u32; EXT_DEVICE_INFO_WORDS];
        pack_words(&bytes, &mut words);
        words
    }

    fn write_info(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.functions.to_be_bytes());
        for (slot, def) in self.definitions.iter().enumerate() {
            let at = 4 + slot * 4;
            bytes[at..at + 4].copy_from_slice(&def.to_be_bytes());
        }
        bytes[16] = self.area_code;
        bytes[17] = self.direction;
        copy_padded(&mut bytes[18..18 + NAME_LEN], self.name);
        copy_padded(&mut bytes[48..48 + LICENSE_LEN], LICENSE);
        bytes[108..110].copy_from_slice(&self.standby_current.to_be_bytes());
        bytes[110..112].copy_from_slice(&self.max_current.to_be_bytes());
    }
}

/// Copy `text` into `field`, truncating or padding with spaces
fn copy_padded(field: &mut [u8], text: &str) {
    field.fill(b' ');
    let src = text.as_bytes();
    let n = src.len().min(field.len());
    field[..n].copy_from_slice(&src[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::unpack_words;

    fn controller() -> DeviceInfo<'static> {
        DeviceInfo {
            functions: 0x0000_0001,
            definitions: [0x000F_06FE, 0, 0],
            area_code: 0xFF,
            direction: 0x00,
            name: "Dreamcast Controller",
            version: "Version 1.010,1998/09/28,315-6211-AB",
            standby_current: 430,
            max_current: 500,
        }
    }

    #[test]
    fn test_info_header_words() {
        let words = controller().encode();
        assert_eq!(words[0], 0x0000_0001);
        assert_eq!(words[1], 0x000F_06FE);
        assert_eq!(words[2], 0);
        assert_eq!(words[3], 0);
        // area, direction, "Dr"
        assert_eq!(words[4], 0xFF00_4472);
    }

    #[test]
    fn test_info_strings_are_space_padded() {
        let words = controller().encode();
        let mut bytes = [0u8; INFO_BYTES];
        unpack_words(&words, &mut bytes);

        assert_eq!(&bytes[18..38], b"Dreamcast Controller");
        assert!(bytes[38..48].iter().all(|&b| b == b' '));
        assert_eq!(&bytes[48..48 + LICENSE.len()], LICENSE.as_bytes());
        assert_eq!(bytes[108..110], 430u16.to_be_bytes());
        assert_eq!(bytes[110..112], 500u16.to_be_bytes());
    }

    #[test]
    fn test_extended_info_appends_version() {
        let info = controller();
        let ext = info.encode_extended();
        assert_eq!(&ext[..DEVICE_INFO_WORDS], &info.encode()[..]);

        let mut bytes = [0u8; EXT_INFO_BYTES];
        unpack_words(&ext, &mut bytes);
        assert_eq!(&bytes[112..112 + info.version.len()], info.version.as_bytes());
        assert_eq!(bytes[EXT_INFO_BYTES - 1], b' ');
    }

    #[test]
    fn test_long_name_is_truncated() {
        let mut info = controller();
        info.name = "A name that is far too long for the thirty byte field";
        let mut bytes = [0u8; INFO_BYTES];
        unpack_words(&info.encode(), &mut bytes);
        assert_eq!(&bytes[18..48], &info.name.as_bytes()[..NAME_LEN]);
        // License field is untouched by the overflow
        assert_eq!(&bytes[48..52], b"Prod");
    }
}
