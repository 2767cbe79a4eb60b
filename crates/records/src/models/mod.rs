mod hardware;
mod id;
mod io;
mod link;
mod manufacturer;
mod price;
mod software;
mod translation;
mod version;

pub use self::hardware::{Hardware, Revision};
pub use self::id::{RecordId, is_token};
pub use self::io::{Io, IoCategory, IoPosition, SignalFlow};
pub use self::link::{Image, Link, LinkKind};
pub use self::manufacturer::Manufacturer;
pub use self::price::Price;
pub use self::software::Software;
pub use self::translation::Translation;
pub use self::version::{ReleaseDate, Version};
