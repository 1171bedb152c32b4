//! Static NFC Forum type 5 tag image holding a single URI record.
//!
//! The image starts at [`NDEF_ADDRESS`](crate::memory::NDEF_ADDRESS) and is laid out as:
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0..4 | capability container |
//! | 4..6 | NDEF message TLV, type `0x03` and length |
//! | 6..10 | short record header, TNF well known, type `U` |
//! | 10.. | URI identifier code and URI |
//! | after | terminator TLV `0xFE`, zero padding |

use crate::Error;
use strum::FromRepr;

const NDEF_MESSAGE_TLV: u8 = 0x03;
const TERMINATOR_TLV: u8 = 0xFE;

/// MB, ME, SR set and TNF "well known".
const SHORT_WELL_KNOWN_RECORD: u8 = 0xD1;
const URI_RECORD_TYPE: u8 = b'U';

/// Bytes before the URI itself.
const URI_OFFSET: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilityContainer {
    pub magic: u8,
    /// Major version in the upper nibble, minor in the lower.
    pub version: u8,
    /// Data area size in units of 8 bytes.
    pub size: u8,
    pub access: u8,
}

impl CapabilityContainer {
    pub const MAGIC: u8 = 0xE1;

    /// Version 1.0, 1936 bytes, read and write access.
    pub const fn default_container() -> Self {
        Self {
            magic: Self::MAGIC,
            version: 0x40,
            size: 0xF2,
            access: 0x00,
        }
    }

    pub const fn bytes(&self) -> [u8; 4] {
        [self.magic, self.version, self.size, self.access]
    }

    pub const fn data_area_size(&self) -> usize {
        self.size as usize * 8
    }
}

impl Default for CapabilityContainer {
    fn default() -> Self {
        Self::default_container()
    }
}

/// URI identifier codes, the abbreviation that precedes the stored URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UriPrefix {
    None = 0x00,
    HttpWww = 0x01,
    HttpsWww = 0x02,
    Http = 0x03,
    Https = 0x04,
    Tel = 0x05,
    Mailto = 0x06,
}

impl UriPrefix {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::HttpWww => "http://www.",
            Self::HttpsWww => "https://www.",
            Self::Http => "http://",
            Self::Https => "https://",
            Self::Tel => "tel:",
            Self::Mailto => "mailto:",
        }
    }
}

/// Smallest image that can hold `uri`.
pub const fn image_len(uri: &[u8]) -> usize {
    URI_OFFSET + uri.len() + 1
}

/// Builds a tag image of `N` bytes, padding with zeros after the terminator.
pub const fn tag_image<const N: usize>(
    container: CapabilityContainer,
    prefix: UriPrefix,
    uri: &[u8],
) -> Result<[u8; N], Error> {
    // The record payload length is a single byte in a short record.
    if uri.len() + 5 > 0xFF || image_len(uri) > N {
        return Err(Error::ImageTooSmall);
    }

    let payload_len = uri.len() as u8 + 1;
    let mut image = [0u8; N];

    let cc = container.bytes();
    image[0] = cc[0];
    image[1] = cc[1];
    image[2] = cc[2];
    image[3] = cc[3];

    image[4] = NDEF_MESSAGE_TLV;
    image[5] = payload_len + 4;

    image[6] = SHORT_WELL_KNOWN_RECORD;
    image[7] = 1;
    image[8] = payload_len;
    image[9] = URI_RECORD_TYPE;
    image[10] = prefix as u8;

    let mut i = 0;
    while i < uri.len() {
        image[URI_OFFSET + i] = uri[i];
        i += 1;
    }
    image[URI_OFFSET + uri.len()] = TERMINATOR_TLV;

    Ok(image)
}

pub const DEFAULT_URI: &[u8] = b"ti.com";
pub const DEFAULT_IMAGE_LEN: usize = 21;

/// The image programmed at start up: `http://www.ti.com`.
pub const DEFAULT_IMAGE: [u8; DEFAULT_IMAGE_LEN] = match tag_image(
    CapabilityContainer::default_container(),
    UriPrefix::HttpWww,
    DEFAULT_URI,
) {
    Ok(image) => image,
    Err(_) => panic!("default tag image does not fit"),
};

/// A URI record read back from a tag image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UriRecord<'a> {
    pub container: CapabilityContainer,
    pub prefix: UriPrefix,
    pub uri: &'a [u8],
}

impl<'a> UriRecord<'a> {
    pub fn parse(image: &'a [u8]) -> Result<Self, Error> {
        let header = image.get(..URI_OFFSET).ok_or(Error::ImageTooSmall)?;

        let container = CapabilityContainer {
            magic: header[0],
            version: header[1],
            size: header[2],
            access: header[3],
        };
        if container.magic != CapabilityContainer::MAGIC
            || header[4] != NDEF_MESSAGE_TLV
            || header[6] != SHORT_WELL_KNOWN_RECORD
            || header[7] != 1
            || header[9] != URI_RECORD_TYPE
        {
            return Err(Error::MalformedImage);
        }

        let payload_len = header[8] as usize;
        if payload_len == 0 || header[5] as usize != payload_len + 4 {
            return Err(Error::MalformedImage);
        }
        let prefix = UriPrefix::from_repr(header[10]).ok_or(Error::MalformedImage)?;

        let end = URI_OFFSET + payload_len - 1;
        let uri = image.get(URI_OFFSET..end).ok_or(Error::ImageTooSmall)?;
        if image.get(end) != Some(&TERMINATOR_TLV) {
            return Err(Error::MalformedImage);
        }

        Ok(Self {
            container,
            prefix,
            uri,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_image_bytes() {
        assert_eq!(
            DEFAULT_IMAGE,
            [
                0xE1, 0x40, 0xF2, 0x00, 0x03, 0x0B, 0xD1, 0x01, 0x07, 0x55, 0x01, 0x74, 0x69,
                0x2E, 0x63, 0x6F, 0x6D, 0xFE, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn default_container() {
        let container = CapabilityContainer::default();
        assert_eq!(container.bytes(), [0xE1, 0x40, 0xF2, 0x00]);
        assert_eq!(container.data_area_size(), 1936);
    }

    #[test]
    fn image_too_small() {
        let result = tag_image::<12>(
            CapabilityContainer::default(),
            UriPrefix::Https,
            b"example.org",
        );
        assert_eq!(result, Err(Error::ImageTooSmall));
    }

    #[test]
    fn exact_fit() {
        let uri = b"example.org";
        let image = tag_image::<{ image_len(b"example.org") }>(
            CapabilityContainer::default(),
            UriPrefix::Https,
            uri,
        )
        .unwrap();

        assert_eq!(image[image.len() - 1], 0xFE);
        assert_eq!(image[5] as usize, uri.len() + 5);
    }

    #[test]
    fn parse_default_image() {
        let record = UriRecord::parse(&DEFAULT_IMAGE).unwrap();

        assert_eq!(record.container, CapabilityContainer::default());
        assert_eq!(record.prefix, UriPrefix::HttpWww);
        assert_eq!(record.prefix.as_str(), "http://www.");
        assert_eq!(record.uri, b"ti.com");
    }

    #[test]
    fn parse_rejects_missing_terminator() {
        let mut image = DEFAULT_IMAGE;
        image[17] = 0x00;
        assert_eq!(UriRecord::parse(&image), Err(Error::MalformedImage));
    }

    #[test]
    fn parse_rejects_truncated_image() {
        assert_eq!(
            UriRecord::parse(&DEFAULT_IMAGE[..8]),
            Err(Error::ImageTooSmall)
        );
        assert_eq!(
            UriRecord::parse(&DEFAULT_IMAGE[..14]),
            Err(Error::ImageTooSmall)
        );
    }

    #[test]
    fn parse_rejects_unknown_prefix() {
        let mut image = DEFAULT_IMAGE;
        image[10] = 0x40;
        assert_eq!(UriRecord::parse(&image), Err(Error::MalformedImage));
    }
}
