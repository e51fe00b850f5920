#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedTask {
    pub title: String,
    pub time: String,
    pub duration_minutes: i64,
}

/// Keyword-driven day plan. Every matching theme contributes its block of
/// suggestions; a prompt with no known keywords falls back to the stock
/// five-slot day.
pub fn suggest_plan(prompt: &str) -> Vec<SuggestedTask> {
    let lowered = prompt.to_lowercase();
    let mut tasks: Vec<SuggestedTask> = Vec::new();

    if contains_any(&lowered, &["productive", "work"]) {
        push_block(
            &mut tasks,
            &[
                ("Deep work session", "09:00", 90),
                ("Email & communication", "11:00", 30),
                ("Project review", "14:00", 60),
            ],
        );
    }

    if contains_any(&lowered, &["healthy", "fitness", "exercise"]) {
        push_block(
            &mut tasks,
            &[
                ("Morning workout", "07:00", 45),
                ("Healthy meal prep", "12:00", 30),
            ],
        );
    }

    if contains_any(&lowered, &["learn", "study", "read"]) {
        push_block(
            &mut tasks,
            &[
                ("Learning session", "10:00", 45),
                ("Reading time", "20:00", 30),
            ],
        );
    }

    if contains_any(&lowered, &["relax", "mindful", "meditation"]) {
        push_block(
            &mut tasks,
            &[
                ("Morning meditation", "06:30", 15),
                ("Evening wind-down", "21:00", 30),
            ],
        );
    }

    if tasks.is_empty() {
        push_block(
            &mut tasks,
            &[
                ("Morning planning", "08:00", 15),
                ("Focus time", "09:00", 60),
                ("Break & refresh", "12:00", 30),
                ("Afternoon tasks", "14:00", 90),
                ("Daily review", "17:00", 15),
            ],
        );
    }

    tasks
}

/// Description stamped on routines created from a plan, carrying the first
/// 50 characters of the prompt.
pub fn plan_description(prompt: &str) -> String {
    let excerpt: String = prompt.chars().take(50).collect();
    format!("Generated from plan: \"{excerpt}...\"")
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

fn push_block(tasks: &mut Vec<SuggestedTask>, block: &[(&str, &str, i64)]) {
    for (title, time, duration_minutes) in block {
        tasks.push(SuggestedTask {
            title: (*title).to_string(),
            time: (*time).to_string(),
            duration_minutes: *duration_minutes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_description, suggest_plan};

    #[test]
    fn work_prompt_yields_work_block() {
        let tasks = suggest_plan("I want to be productive at work");
        let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();

        assert_eq!(
            titles,
            vec!["Deep work session", "Email & communication", "Project review"]
        );
    }

    #[test]
    fn matching_themes_accumulate() {
        let tasks = suggest_plan("Productive work and healthy exercise");
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[3].title, "Morning workout");
    }

    #[test]
    fn unknown_prompt_falls_back_to_stock_day() {
        let tasks = suggest_plan("just an ordinary tuesday");
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[0].title, "Morning planning");
        assert_eq!(tasks[4].title, "Daily review");
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let tasks = suggest_plan("MEDITATION and Study");
        let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();

        assert_eq!(
            titles,
            vec![
                "Learning session",
                "Reading time",
                "Morning meditation",
                "Evening wind-down"
            ]
        );
    }

    #[test]
    fn description_truncates_long_prompts() {
        let prompt = "a".repeat(80);
        let description = plan_description(&prompt);

        assert!(description.starts_with("Generated from plan: \""));
        assert!(description.contains(&"a".repeat(50)));
        assert!(!description.contains(&"a".repeat(51)));
    }
}
