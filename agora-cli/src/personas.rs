//! Launcher personas: prompt template, known peers and reply language

use agora_core::config::ActorConfig;
use agora_core::identifiers::{ActorId, PersonaType};
use agora_core::state::PeerInfo;

const CONSUMER_PROMPT: &str = "\
You are a dedicated personal shopping assistant for {actor_id}.
This includes handling all communication with bank agents, collecting quotes, summarizing and ranking payment plans and finally showing them to your user/operator.
- All messages must be sent through tool calls.
- Bank agents know that you are an AI assistant.
- Contact bank agents with purchase and discount details.
- Rank offers by the best terms and remove duplicate offers from different banks.
- Only notify your user/operator of final results or when you need guidance.
- Keep messages to agents concise and straightforward. Always include the purchase link.
- Use markdown features like strikethrough and emojis when presenting offers.";

const ISSUER_PROMPT: &str = "\
You are a banking/issuer assistant for {actor_id}, managing purchase requests and providing tailored payment options.
Your core responsibilities:
- Process purchase intents from Consumer agents.
- Ask Merchant agents for product details and availability, then apply the best payment options (EMI, pay later, cashback, trade-in).
- Manage tasks autonomously, scheduling reminders and follow-ups.
- Communicate through tool calls.
When interacting with Consumer and Merchant agents:
1. Receive purchase requests from Consumer agents.
2. Request product information from Merchant agents.";

const MERCHANT_PROMPT: &str = "\
You are a merchant assistant for {actor_id}, managing purchase requests and providing tailored payment options.
Your core responsibilities:
- Process purchase intents from Consumer agents.
- Work with Issuer agents to apply the best payment options (EMI, pay later, cashback, trade-in) and share product details and availability.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Consumer,
    Merchant,
    Issuer,
}

impl Persona {
    pub fn from_persona_type(persona_type: &PersonaType) -> Option<Self> {
        match persona_type.canonical().as_str() {
            "consumer" => Some(Persona::Consumer),
            "merchant" => Some(Persona::Merchant),
            "issuer" => Some(Persona::Issuer),
            _ => None,
        }
    }

    pub fn persona_type(&self) -> PersonaType {
        let name = match self {
            Persona::Consumer => "Consumer",
            Persona::Merchant => "Merchant",
            Persona::Issuer => "Issuer",
        };
        PersonaType::new_unchecked(name)
    }

    /// Configuration for an actor of this persona named `actor_id`
    pub fn config(&self, actor_id: &ActorId) -> ActorConfig {
        let (template, peers, language) = match self {
            Persona::Consumer => (CONSUMER_PROMPT, banks(), Some("Bengali")),
            Persona::Merchant => (MERCHANT_PROMPT, banks(), None),
            Persona::Issuer => (
                ISSUER_PROMPT,
                vec![
                    peer("Amazon", Persona::Merchant, "Amazon is an e-commerce platform that sells a variety of products and adds discounts."),
                    peer("Anil", Persona::Consumer, "Anil is a premium user with a high credit score. His primary interests lie in electronics and toys, and he prefers flexible EMI options along with cashback offers. He enjoys top-tier benefits and access to exclusive deals."),
                    peer("Croma", Persona::Merchant, "Croma is an e-commerce platform that sells a variety of products and adds discounts."),
                ],
                None,
            ),
        };

        let mut config = ActorConfig::new(template.replace("{actor_id}", actor_id.as_str()));
        for (id, info) in peers {
            config = config.with_peer(id, info);
        }
        match language {
            Some(language) => config.with_language(language),
            None => config,
        }
    }
}

fn peer(id: &str, persona: Persona, about: &str) -> (ActorId, PeerInfo) {
    (
        ActorId::new_unchecked(id),
        PeerInfo::new(persona.persona_type(), about),
    )
}

fn banks() -> Vec<(ActorId, PeerInfo)> {
    vec![
        peer("HDFCBank", Persona::Issuer, "HDFC Bank communicates with merchants to find products and create payment plans for consumers."),
        peer("ICICIBank", Persona::Issuer, "ICICI Bank communicates with merchants to find products and create payment plans for consumers."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_talks_to_banks_in_bengali() {
        let config = Persona::Consumer.config(&ActorId::parse("Anil").unwrap());
        assert_eq!(config.language, "Bengali");
        assert!(config.system_prompt.contains("shopping assistant for Anil"));
        let ids: Vec<_> = config.peers.keys().map(ActorId::as_str).collect();
        assert_eq!(ids, vec!["HDFCBank", "ICICIBank"]);
    }

    #[test]
    fn issuer_knows_merchants_and_consumer() {
        let config = Persona::Issuer.config(&ActorId::parse("HDFCBank").unwrap());
        assert_eq!(config.language, "English");
        let anil = &config.peers[&ActorId::parse("Anil").unwrap()];
        assert_eq!(anil.persona_type.as_str(), "Consumer");
        assert_eq!(config.peers.len(), 3);
    }

    #[test]
    fn persona_round_trips_through_its_type() {
        for persona in [Persona::Consumer, Persona::Merchant, Persona::Issuer] {
            assert_eq!(Persona::from_persona_type(&persona.persona_type()), Some(persona));
        }
    }
}
