//! Text posted back into the chat. RingCentral renders a Markdown subset, so everything here
//! is plain strings with `**bold**` and backtick spans.

use clarity_agent::AgentResponse;
use clarity_core::{CampaignId, Intent};

/// The inline mention the platform inserts when someone addresses a person or bot.
pub fn mention(person_id: &str) -> String {
    format!("![:Person]({person_id})")
}

pub fn welcome(bot_id: &str) -> String {
    format!(
        "👋 Hello! I'm **MFChat**, your Campaign Clarity assistant!\n\n\
I can analyze Salesforce campaigns and provide AI-powered insights to help you understand \
prospect behavior.\n\n\
**How to use me:**\n\
• Send me a campaign ID: `701Hr000001L82yIAC`\n\
• Ask me to analyze: `analyze 701Hr000001L82yIAC`\n\
• Ask about a campaign: `what is campaign 701Hr000001L82yIAC?`\n\
• Get help: `help`\n\n\
Just mention me with {} and your request!",
        mention(bot_id)
    )
}

pub fn identity() -> String {
    "👋 **Hi! I'm MFChat - Your Campaign Clarity Assistant**\n\n\
**Purpose:** I help sales teams understand Salesforce campaigns by translating technical \
marketing data into actionable sales insights.\n\n\
**What I Can Do:**\n\n\
🔍 **Basic Campaign Info** - Get Salesforce metadata (channel, type, enriched context)\n\
  • _Example:_ \"Give me the Salesforce information about campaign 701Hr000001L82yIAC\"\n\n\
💡 **AI Sales Description** - Get AI-generated sales guidance (buyer intent, next steps, \
outreach)\n\
  • _Example:_ \"What can you tell me about 701Hr000001L82yIAC?\"\n\
  • _Example:_ \"Give me a summary of campaign 701Hr000001L9q4IAC\"\n\
  • _Example:_ \"Describe this campaign: 701TU00000ad4whYAA\"\n\n\
📊 **Full Campaign Analysis** - Get everything (metadata + AI description + context)\n\
  • _Example:_ \"Give me a full analysis of 701Hr000001L82yIAC\"\n\
  • _Example:_ \"I need complete information on 701TU00000ayWTJYA2\"\n\n\
**Requirements:**\n\
✅ Must provide a Salesforce Campaign ID (15-18 characters, usually starts with '701')\n\
❌ Cannot search by campaign name (ID required)\n\n\
**Need more help?** Just say \"help\" for more examples!"
        .to_owned()
}

pub fn help(bot_id: &str) -> String {
    format!(
        "📚 **MFChat - Campaign Clarity Help**\n\n\
**I can analyze Salesforce campaigns!** Just give me a campaign ID and I'll provide the \
information you need.\n\n\
**Three Ways to Use Me:**\n\n\
1️⃣ **Basic Info** - Salesforce metadata only\n\
   • `Give me the Salesforce information about 701Hr000001L82yIAC`\n\n\
2️⃣ **AI Description** - Sales guidance only (default)\n\
   • `What is 701Hr000001L82yIAC?`\n\
   • `Describe campaign 701Hr000001L9q4IAC`\n\
   • `Give me a summary of 701TU00000ad4whYAA`\n\n\
3️⃣ **Full Analysis** - Everything combined\n\
   • `Full analysis of 701Hr000001L82yIAC`\n\
   • `Give me complete information on 701Hr000001L8QHIA0`\n\n\
**Sample Campaign IDs:**\n\
• `701Hr000001L82yIAC` - SMB RingEX Nurture\n\
• `701Hr000001L8QHIA0` - Healthcare Nurture\n\
• `701Hr000001L9q4IAC` - Partner Referral\n\
• `701TU00000ad4whYAA` - Content Syndication\n\n\
Just mention me with {} and your request!",
        mention(bot_id)
    )
}

/// Reply for a mention that names no campaign and has nothing to follow up on.
pub fn need_campaign_id(creator_id: &str) -> String {
    format!(
        "👋 Hi {}! I'm **MFChat**, your Campaign Clarity assistant.\n\n\
I help sales teams understand Salesforce campaigns by providing:\n\
• **Basic campaign info** (channel, type, context)\n\
• **AI-generated sales descriptions** (buyer intent, next steps)\n\
• **Full campaign analysis** (everything combined)\n\n\
**I need a campaign ID to help you!** \n\
Please provide a Salesforce campaign ID (15-18 characters, usually starts with 701).\n\n\
**Examples:**\n\
• `What is 701Hr000001L82yIAC?` - Get AI description\n\
• `Full analysis of 701Hr000001L8QHIA0` - Get everything\n\
• `Salesforce info for 701Hr000001L9q4IAC` - Get basic info\n\n\
Say **help** for more details or **what are you** to learn about my capabilities!",
        mention(creator_id)
    )
}

pub fn thinking(intent: Intent, campaign_id: &CampaignId) -> String {
    match intent {
        Intent::BasicInfo => {
            format!("🔍 Fetching Salesforce information for campaign `{campaign_id}`...")
        }
        Intent::AiDescription => {
            format!("🤖 Generating sales description for campaign `{campaign_id}`...")
        }
        Intent::FullAnalysis => format!(
            "📊 Performing full analysis of campaign `{campaign_id}`...\n\n\
This may take a few seconds."
        ),
    }
}

pub fn agent_reply(response: &AgentResponse) -> String {
    if response.success {
        format!("🎯 **Campaign Analysis Complete!**\n\n{}", response.response)
    } else {
        format!("⚠️ **Analysis Issue**\n\n{}", response.response)
    }
}

#[cfg(test)]
mod tests {
    use clarity_agent::AgentResponse;
    use clarity_core::{CampaignId, Intent};

    use super::{agent_reply, help, mention, need_campaign_id, thinking, welcome};

    #[test]
    fn thinking_message_follows_intent() {
        let id = CampaignId::parse("701Hr000001L82yIAC").expect("valid id");

        assert_eq!(
            thinking(Intent::BasicInfo, &id),
            "🔍 Fetching Salesforce information for campaign `701Hr000001L82yIAC`..."
        );
        assert_eq!(
            thinking(Intent::AiDescription, &id),
            "🤖 Generating sales description for campaign `701Hr000001L82yIAC`..."
        );
        assert_eq!(
            thinking(Intent::FullAnalysis, &id),
            "📊 Performing full analysis of campaign `701Hr000001L82yIAC`...\n\n\
This may take a few seconds."
        );
    }

    #[test]
    fn agent_reply_has_outcome_header() {
        let ok = AgentResponse {
            success: true,
            response: "All good".to_owned(),
            error: None,
            iterations: 2,
        };
        let failed = AgentResponse {
            success: false,
            response: "Nope".to_owned(),
            error: Some("Maximum iterations reached".to_owned()),
            iterations: 10,
        };

        assert_eq!(agent_reply(&ok), "🎯 **Campaign Analysis Complete!**\n\nAll good");
        assert_eq!(agent_reply(&failed), "⚠️ **Analysis Issue**\n\nNope");
    }

    #[test]
    fn guidance_texts_mention_the_right_person() {
        assert_eq!(mention("12345"), "![:Person](12345)");
        assert!(welcome("999").contains("Just mention me with ![:Person](999)"));
        assert!(help("999").ends_with("Just mention me with ![:Person](999) and your request!"));
        assert!(need_campaign_id("42").starts_with("👋 Hi ![:Person](42)!"));
    }
}
