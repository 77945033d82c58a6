use clarity_agent::conversation::{
    classify_intent, is_help_request, is_identity_question, CampaignIdExtractor, FollowUpResolver,
};
use serde_json::json;

use super::{CommandResult, EXIT_BOOTSTRAP};

/// Runs the chat rules over one message without touching Salesforce or the model.
pub fn run(text: &str) -> CommandResult {
    let (extractor, follow_ups) = match (CampaignIdExtractor::new(), FollowUpResolver::new()) {
        (Ok(extractor), Ok(follow_ups)) => (extractor, follow_ups),
        (Err(error), _) | (_, Err(error)) => {
            let message = error.to_string();
            return CommandResult::failure("classify", "patterns", message, EXIT_BOOTSTRAP);
        }
    };

    let intent = classify_intent(text);
    let campaign_id = extractor.extract(text);
    let follow_up = campaign_id.is_none() && follow_ups.is_follow_up(text);
    let route = if is_identity_question(text) {
        "identity"
    } else if is_help_request(text) {
        "help"
    } else if campaign_id.is_some() {
        "analyze"
    } else if follow_up {
        "follow_up"
    } else {
        "need_campaign_id"
    };

    CommandResult::success_with_data(
        "classify",
        format!("{route}: {intent}"),
        Some(json!({
            "route": route,
            "intent": intent,
            "campaign_id": campaign_id.as_ref().map(|id| id.as_str()),
            "follow_up": follow_up,
        })),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::run;

    fn data(text: &str) -> Value {
        let result = run(text);
        assert_eq!(result.exit_code, 0);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        payload["data"].clone()
    }

    #[test]
    fn reports_intent_and_campaign() {
        let data = data("full analysis and channel for 701Hr000001L82yIAC");

        assert_eq!(data["route"], "analyze");
        assert_eq!(data["intent"], "full_analysis");
        assert_eq!(data["campaign_id"], "701Hr000001L82yIAC");
        assert_eq!(data["follow_up"], false);
    }

    #[test]
    fn reports_follow_up_and_fallbacks() {
        assert_eq!(data("what about that campaign")["route"], "follow_up");
        assert_eq!(data("who are you")["route"], "identity");
        assert_eq!(data("help")["route"], "help");
        assert_eq!(data("good morning")["route"], "need_campaign_id");
        assert_eq!(data("good morning")["campaign_id"], Value::Null);
    }
}
