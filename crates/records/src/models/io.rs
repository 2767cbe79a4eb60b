use serde::{Deserialize, Serialize};

/// A physical or logical connection point on a hardware device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Io {
    pub name: String,
    pub signal_flow: SignalFlow,
    pub category: IoCategory,
    /// Connector type, e.g. `"xlr"` or `"trs-6.35mm"`.
    #[serde(rename = "type")]
    pub connector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    /// Where on the device the connector sits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<IoPosition>,
}

macro_rules! names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every accepted spelling, for validation and suggestions.
            pub const NAMES: &'static [&'static str] = &[$($name),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalFlow {
    Input,
    Output,
    Bidirectional,
}
names!(SignalFlow { Input => "input", Output => "output", Bidirectional => "bidirectional" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoCategory {
    Audio,
    Midi,
    Digital,
    Cv,
    Power,
    Data,
    Other,
}
names!(IoCategory {
    Audio => "audio",
    Midi => "midi",
    Digital => "digital",
    Cv => "cv",
    Power => "power",
    Data => "data",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoPosition {
    Front,
    Back,
    Top,
    Bottom,
    Left,
    Right,
}
names!(IoPosition {
    Front => "front",
    Back => "back",
    Top => "top",
    Bottom => "bottom",
    Left => "left",
    Right => "right",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_io() {
        let io: Io = serde_yaml::from_str(
            "name: Main Out L\nsignalFlow: output\ncategory: audio\ntype: trs-6.35mm\nposition: back\n",
        )
        .unwrap();
        assert_eq!(io.signal_flow, SignalFlow::Output);
        assert_eq!(io.connector, "trs-6.35mm");
        assert_eq!(io.position, Some(IoPosition::Back));
        assert_eq!(io.max_connections, None);
    }

    #[test]
    fn test_names_round_trip() {
        for name in IoCategory::NAMES {
            let category: IoCategory = serde_yaml::from_str(name).unwrap();
            assert_eq!(category.as_str(), *name);
        }
    }
}
