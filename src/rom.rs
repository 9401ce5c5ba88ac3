/*!
ROM images and the optional header page.

A ROM file is a raw memory image. It may be prefixed by one 256-byte header
page, written by the `b6xzp` utility, that describes the image:

```text
0x00  "UXNR"          signature
0x04  "B6X"           target system
0x0E  u16             target version
0x10  [u8; 48]        title, NUL padded
0x40  [u8; 32]        author, NUL padded
0x60  u16             checksum: XOR of every big-endian word of the payload
0x62  u16             page count, header page included
0x70  [u8; 8]         creation time, native-endian seconds since the epoch
```

All 16-bit fields are big-endian. The payload is padded to whole pages.

The whole file, header included, is what gets loaded into memory; a
headered image therefore starts executing at 0x0100.
*/

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const PAGE_SIZE: usize = 256;
pub const SIGNATURE: &[u8; 4] = b"UXNR";
pub const SYSTEM: &[u8; 3] = b"B6X";
/// Target version stamped when none is given.
pub const DEFAULT_VERSION: u16 = 0x0100;
/// Most payload pages a header can describe (the count field includes the
/// header page itself).
pub const MAX_PAYLOAD_PAGES: usize = 0xFFFF;
/// Entry point of a headered image.
pub const HEADERED_ENTRY: u16 = 0x0100;

const VERSION_AT: usize = 0x0E;
const TITLE_AT: usize = 0x10;
const TITLE_LEN: usize = 48;
const AUTHOR_AT: usize = 0x40;
const AUTHOR_LEN: usize = 32;
const CHECKSUM_AT: usize = 0x60;
const PAGES_AT: usize = 0x62;
const TIME_AT: usize = 0x70;

/// The bytes of a ROM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        log::info!("rom: {} ({} bytes)", path.as_ref().display(), bytes.len());
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parsed header page, if the image starts with the signature.
    pub fn header(&self) -> Option<RomHeader> {
        if !self.bytes.starts_with(SIGNATURE) {
            return None;
        }
        match RomHeader::parse(&self.bytes) {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("rom: {e}");
                None
            }
        }
    }

    /// Where execution starts when this image is loaded at 0.
    pub fn entry(&self) -> u16 {
        if self.header().is_some() { HEADERED_ENTRY } else { 0 }
    }
}

/// Decoded header page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    pub system: String,
    pub version: u16,
    pub title: String,
    pub author: String,
    pub checksum: u16,
    pub page_count: u16,
    pub created: i64,
}

fn word_at(page: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([page[at], page[at + 1]])
}

fn text_at(page: &[u8], at: usize, len: usize) -> String {
    let field = &page[at..at + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// XOR of the big-endian words of `payload`, padded with zeros to an even
/// length.
pub fn checksum(payload: &[u8]) -> u16 {
    payload.chunks(2).fold(0, |acc, w| {
        let hi = w[0] as u16;
        let lo = w.get(1).copied().unwrap_or(0) as u16;
        acc ^ ((hi << 8) | lo)
    })
}

impl RomHeader {
    /// Parse the first page of `image`.
    pub fn parse(image: &[u8]) -> Result<Self> {
        if image.len() < PAGE_SIZE {
            return Err(Error::InvalidHeader(format!(
                "image is {} bytes, shorter than one page",
                image.len()
            )));
        }
        let page = &image[..PAGE_SIZE];
        if &page[..4] != SIGNATURE {
            return Err(Error::InvalidHeader("missing UXNR signature".into()));
        }
        let mut time = [0u8; 8];
        time.copy_from_slice(&page[TIME_AT..TIME_AT + 8]);
        Ok(Self {
            system: text_at(page, 4, 3),
            version: word_at(page, VERSION_AT),
            title: text_at(page, TITLE_AT, TITLE_LEN),
            author: text_at(page, AUTHOR_AT, AUTHOR_LEN),
            checksum: word_at(page, CHECKSUM_AT),
            page_count: word_at(page, PAGES_AT),
            created: i64::from_ne_bytes(time),
        })
    }

    /// Whether `image` (header included) matches the recorded checksum.
    pub fn verify(&self, image: &[u8]) -> bool {
        image.len() >= PAGE_SIZE && checksum(&image[PAGE_SIZE..]) == self.checksum
    }
}

/// What `stamp` writes into a new header page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub title: String,
    pub author: String,
    pub version: u16,
    /// Seconds since the Unix epoch.
    pub created: i64,
}

impl Default for HeaderInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            version: DEFAULT_VERSION,
            created: 0,
        }
    }
}

impl HeaderInfo {
    /// Creation time set to now.
    pub fn now() -> Self {
        let created = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        Self {
            created,
            ..Self::default()
        }
    }
}

fn put_text(page: &mut [u8], at: usize, len: usize, text: &str, what: &str) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() > len {
        return Err(Error::InvalidHeader(format!(
            "{what} is {} bytes, field holds {len}",
            bytes.len()
        )));
    }
    page[at..at + bytes.len()].copy_from_slice(bytes);
    Ok(())
}

/// Pad `payload` to whole pages and prefix a header page describing it.
pub fn stamp(payload: &[u8], info: &HeaderInfo) -> Result<Vec<u8>> {
    let mut pages = payload.len().div_ceil(PAGE_SIZE);
    let mut payload = payload;
    if pages > MAX_PAYLOAD_PAGES {
        log::warn!("stamp: {pages} pages exceed the maximum of {MAX_PAYLOAD_PAGES}; truncating");
        pages = MAX_PAYLOAD_PAGES;
        payload = &payload[..MAX_PAYLOAD_PAGES * PAGE_SIZE];
    }

    let mut out = vec![0u8; PAGE_SIZE * (pages + 1)];
    out[PAGE_SIZE..PAGE_SIZE + payload.len()].copy_from_slice(payload);

    let sum = checksum(&out[PAGE_SIZE..]);
    let header = &mut out[..PAGE_SIZE];
    header[..4].copy_from_slice(SIGNATURE);
    header[4..7].copy_from_slice(SYSTEM);
    header[VERSION_AT..VERSION_AT + 2].copy_from_slice(&info.version.to_be_bytes());
    put_text(header, TITLE_AT, TITLE_LEN, &info.title, "title")?;
    put_text(header, AUTHOR_AT, AUTHOR_LEN, &info.author, "author")?;
    header[CHECKSUM_AT..CHECKSUM_AT + 2].copy_from_slice(&sum.to_be_bytes());
    // Truncated to 16 bits: a full 65535-page payload records 0.
    let count = (pages + 1) as u16;
    header[PAGES_AT..PAGES_AT + 2].copy_from_slice(&count.to_be_bytes());
    header[TIME_AT..TIME_AT + 8].copy_from_slice(&info.created.to_ne_bytes());

    Ok(out)
}
