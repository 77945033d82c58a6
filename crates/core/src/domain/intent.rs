use std::fmt;

use serde::{Deserialize, Serialize};

/// Level of detail a user wants about a campaign.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BasicInfo,
    #[default]
    AiDescription,
    FullAnalysis,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Self::BasicInfo, Self::AiDescription, Self::FullAnalysis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::AiDescription => "ai_description",
            Self::FullAnalysis => "full_analysis",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic_info" => Ok(Self::BasicInfo),
            "ai_description" => Ok(Self::AiDescription),
            "full_analysis" => Ok(Self::FullAnalysis),
            other => Err(format!(
                "unsupported intent `{other}` (expected basic_info|ai_description|full_analysis)"
            )),
        }
    }
}
