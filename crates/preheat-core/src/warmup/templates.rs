//! Warmup content templates - subject/body rendering with variable substitution

use preheat_common::types::ContentType;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

struct Template {
    subject: &'static str,
    body: &'static str,
}

const INTRODUCTION: &[Template] = &[
    Template {
        subject: "Quick introduction from {{sender_name}}",
        body: "Hi {{recipient_name}},\n\nI wanted to reach out and introduce myself. \
               I'm {{sender_name}}, and I thought it would be good to connect.\n\n\
               Looking forward to staying in touch.\n\nBest,\n{{sender_name}}",
    },
    Template {
        subject: "Hello from {{sender_name}}",
        body: "Hi {{recipient_name}},\n\nJust a short note to say hello and open a line \
               of communication. Happy to chat whenever works for you.\n\n\
               Best regards,\n{{sender_name}}",
    },
];

const FOLLOW_UP: &[Template] = &[
    Template {
        subject: "Following up on my last note",
        body: "Hi {{recipient_name}},\n\nCircling back on my earlier message. \
               No rush at all; just wanted to keep the thread warm.\n\n\
               Best,\n{{sender_name}}",
    },
    Template {
        subject: "Checking in",
        body: "Hi {{recipient_name}},\n\nHope your week is going well. \
               Wanted to check in and see if there's anything I can help with.\n\n\
               Thanks,\n{{sender_name}}",
    },
];

const NEWSLETTER: &[Template] = &[
    Template {
        subject: "A few things worth sharing this week",
        body: "Hi {{recipient_name}},\n\nHere's a short roundup of things we've been \
               working on lately. Always happy to hear what you think.\n\n\
               Cheers,\n{{sender_name}}",
    },
    Template {
        subject: "This week's update",
        body: "Hi {{recipient_name}},\n\nA quick update on what's new on our side. \
               Reply any time if something catches your eye.\n\n\
               Best,\n{{sender_name}}",
    },
];

const PROMOTIONAL: &[Template] = &[
    Template {
        subject: "Something you might find useful",
        body: "Hi {{recipient_name}},\n\nWe recently put together something I think \
               could be useful for you. Would love to hear your thoughts.\n\n\
               Best,\n{{sender_name}}",
    },
    Template {
        subject: "Thought of you for this",
        body: "Hi {{recipient_name}},\n\nThis seemed relevant to what you're working \
               on, so I wanted to pass it along.\n\nBest regards,\n{{sender_name}}",
    },
];

fn variants(content_type: ContentType) -> &'static [Template] {
    match content_type {
        ContentType::Introduction => INTRODUCTION,
        ContentType::FollowUp => FOLLOW_UP,
        ContentType::Newsletter => NEWSLETTER,
        ContentType::Promotional => PROMOTIONAL,
    }
}

/// Render a subject/body pair for one warmup email
pub fn render<R: Rng + ?Sized>(
    content_type: ContentType,
    recipient_name: Option<&str>,
    sender_name: &str,
    rng: &mut R,
) -> (String, String) {
    let template = variants(content_type)
        .choose(rng)
        .expect("template tables are never empty");

    let recipient = recipient_name.unwrap_or("there");

    let subject = substitute(template.subject, recipient, sender_name);
    let body = substitute(template.body, recipient, sender_name);

    (subject, body)
}

fn substitute(template: &str, recipient_name: &str, sender_name: &str) -> String {
    let result = template
        .replace("{{recipient_name}}", recipient_name)
        .replace("{{sender_name}}", sender_name);

    remove_unused_placeholders(&result)
}

/// Remove any placeholder that survived substitution
fn remove_unused_placeholders(content: &str) -> String {
    let re = Regex::new(r"\{\{[^}]+\}\}").unwrap();
    re.replace_all(content, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_render_substitutes_names() {
        let mut rng = StdRng::seed_from_u64(7);
        let (subject, body) = render(
            ContentType::Introduction,
            Some("Dana"),
            "Alex Rivera",
            &mut rng,
        );

        assert!(!subject.contains("{{"));
        assert!(!body.contains("{{"));
        assert!(body.contains("Dana"));
        assert!(body.contains("Alex Rivera"));
    }

    #[test]
    fn test_render_falls_back_without_recipient_name() {
        let mut rng = StdRng::seed_from_u64(7);
        let (_, body) = render(ContentType::FollowUp, None, "Alex", &mut rng);
        assert!(body.contains("Hi there"));
    }

    #[test]
    fn test_all_content_types_have_variants() {
        let mut rng = StdRng::seed_from_u64(1);
        for content_type in [
            ContentType::Introduction,
            ContentType::FollowUp,
            ContentType::Newsletter,
            ContentType::Promotional,
        ] {
            let (subject, body) = render(content_type, Some("Sam"), "Alex", &mut rng);
            assert!(!subject.is_empty());
            assert!(!body.is_empty());
        }
    }

    #[test]
    fn test_unresolved_placeholders_are_stripped() {
        let cleaned = substitute("Hello {{unknown_var}} {{recipient_name}}", "Sam", "Alex");
        assert_eq!(cleaned, "Hello  Sam");
    }
}
