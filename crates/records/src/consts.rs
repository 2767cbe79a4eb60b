use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(SLUG_REGEX, r"^[a-z0-9][a-z0-9-]*[a-z0-9]$|^[a-z0-9]$");
regex!(TOKEN_ID_REGEX, r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$");
regex!(LEGACY_ID_REGEX, r"^[0-9]+$");
