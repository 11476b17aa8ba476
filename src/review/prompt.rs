//! Prompt templates for persona reviews and the review summary.

use crate::persona::{ConsumerProfile, ExpertProfile, ReviewerProfile};

use super::subject::ProductContext;

/// System message for the summary request.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a professional review analyst. Your task is to \
provide a comprehensive and insightful summary of the given product reviews. Follow the structure \
provided and ensure your response is strictly in JSON format. Be precise, clear, and include \
actionable insights while adhering to the required output format.";

const SUMMARY_SCHEMA: &str = r#"{
    "overall_sentiment": "string (e.g., Very Positive, Positive, Neutral, Negative, Very Negative)",
    "purchase_intent_percentage": float (0-100),
    "confidence_score": float (0-100),
    "key_strengths": ["List of 3-5 main strengths"],
    "key_concerns": ["List of 3-5 main concerns"],
    "demographic_insights": {
        "profession_based": "e.g., Engineers liked the product for its durability",
        "age_based": "e.g., Popular among users aged 25-34",
        "nationality_based": "e.g., Preferred by users in North America"
    },
    "common_themes": ["List of 4-6 recurring themes"],
    "recommendation": "e.g., This product is recommended for...",
    "detailed_summary": "2-3 paragraphs with a natural summary"
}"#;

/// System prompt that puts the model in a persona's shoes.
pub fn persona_system_prompt(profile: &ReviewerProfile) -> String {
    match profile {
        ReviewerProfile::Consumer(consumer) => consumer_system_prompt(consumer),
        ReviewerProfile::Expert(expert) => expert_system_prompt(expert),
    }
}

fn consumer_system_prompt(profile: &ConsumerProfile) -> String {
    format!(
        "You are an honest {nationality} aged {age}, a {profession} with an annual salary range of \
{salary}. You prioritize {priorities} when assessing products, considering not just practicality \
and budget but also how well the product fits into your personal interests, hobbies like \
{hobbies}, and lifestyle. When reviewing, consider the product's strengths, weaknesses, \
uniqueness, and how it aligns with your daily routine and personal constraints such as \
{constraints}. Provide a comprehensive review with your purchase recommendation and include a \
confidence percentage. Format your response as: REVIEW: [Your detailed review with purchase \
recommendation and percentage]",
        nationality = profile.nationality.to_lowercase(),
        age = profile.age,
        profession = profile.profession.to_lowercase(),
        salary = profile.salary_range,
        priorities = profile.priorities,
        hobbies = profile.hobbies,
        constraints = profile.constraints,
    )
}

fn expert_system_prompt(profile: &ExpertProfile) -> String {
    format!(
        "You are an experienced professional working as a {profession} with {years} years of \
experience.

Your expertise includes: {expertise}
Specializations: {specializations}
Industry focus: {industry}

When reviewing, evaluate:
1. Design & Layout
2. User Experience
3. Content Quality
4. Technical Implementation
5. Recommendations for Improvement

Include a purchase recommendation and a confidence percentage.

Format your response as:
REVIEW: [Your detailed review with recommendations]",
        profession = profile.profession,
        years = profile.years_experience,
        expertise = profile.expertise_areas,
        specializations = profile.specializations,
        industry = profile.industry_focus,
    )
}

/// User message asking for the structured summary of `reviews`.
pub fn summary_prompt(reviews: &[String], product: &ProductContext) -> String {
    let reviews_text = reviews
        .iter()
        .enumerate()
        .map(|(i, review)| format!("Review {}: {}", i + 1, review))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze these product reviews and provide insights as a JSON object in the exact format \
below. Your response must be strict JSON without additional text or comments.
- Your response contains no duplicate keys.
- It adheres strictly to the provided JSON format.

Product Context:
Name: {name}
Description: {description}
Price: {price}
Category: {category}

Personas and Reviews:
{reviews_text}

Required JSON format:
{schema}
Ensure that your output is strictly valid JSON. Do not include any additional commentary.",
        name = product.name,
        description = product.description,
        price = product.price,
        category = product.category,
        reviews_text = reviews_text,
        schema = SUMMARY_SCHEMA,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SUMMARY_PROMPT_MARKER;

    fn profile() -> ReviewerProfile {
        ReviewerProfile::Consumer(ConsumerProfile {
            name: "Alice".into(),
            age: 29,
            profession: "Software Engineer".into(),
            nationality: "Canadian".into(),
            salary_range: "80k-100k".into(),
            hobbies: "gaming, hiking".into(),
            priorities: "Quality".into(),
            constraints: "Budget".into(),
        })
    }

    #[test]
    fn test_persona_prompt_interpolates_profile() {
        let prompt = persona_system_prompt(&profile());
        assert!(prompt.starts_with("You are an honest canadian aged 29, a software engineer"));
        assert!(prompt.contains("salary range of 80k-100k"));
        assert!(prompt.contains("You prioritize Quality"));
        assert!(prompt.contains("hobbies like gaming, hiking"));
        assert!(prompt.contains("constraints such as Budget"));
        assert!(prompt.contains("Format your response as: REVIEW:"));
    }

    #[test]
    fn test_expert_prompt_interpolates_profile() {
        let prompt = persona_system_prompt(&ReviewerProfile::Expert(ExpertProfile {
            name: "Reviewer_1234".into(),
            age: 41,
            profession: "UX designer".into(),
            years_experience: 15,
            industry_focus: "E-commerce".into(),
            expertise_areas: "Accessibility, UX/UI".into(),
            specializations: "Figma".into(),
        }));

        assert!(prompt.contains("working as a UX designer with 15 years of experience"));
        assert!(prompt.contains("Your expertise includes: Accessibility, UX/UI"));
        assert!(prompt.contains("Specializations: Figma"));
        assert!(prompt.contains("Industry focus: E-commerce"));
        assert!(prompt.contains("4. Technical Implementation"));
        assert!(prompt.ends_with("REVIEW: [Your detailed review with recommendations]"));
    }

    #[test]
    fn test_summary_prompt_labels_reviews() {
        let context = ProductContext {
            name: "Lamp".into(),
            description: "A lamp".into(),
            price: "$20".into(),
            category: "N/A".into(),
        };
        let reviews = vec!["Great".to_string(), "Meh".to_string()];
        let prompt = summary_prompt(&reviews, &context);

        assert!(prompt.contains("Name: Lamp\nDescription: A lamp\nPrice: $20\nCategory: N/A"));
        assert!(prompt.contains("Review 1: Great\n\nReview 2: Meh"));
        assert!(prompt.contains(SUMMARY_PROMPT_MARKER));
        assert!(prompt.contains("\"demographic_insights\""));
    }
}
