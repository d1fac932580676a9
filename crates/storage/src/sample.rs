use quiz_core::model::{AnswerKey, Question, QuestionError, QuestionId, QuestionKind};

fn question(
    id: u64,
    text: &str,
    choices: &[&str],
    key: AnswerKey,
    kind: QuestionKind,
    category: &str,
) -> Result<Question, QuestionError> {
    Question::new(
        QuestionId::new(id),
        text,
        choices.iter().map(|c| (*c).to_owned()).collect(),
        key,
        kind,
        category,
    )
}

/// The built-in civics question bank.
///
/// Used by the in-memory backend and the seed command so the app works out
/// of the box without question files.
///
/// # Errors
///
/// Returns `QuestionError` if an entry fails validation.
#[allow(clippy::too_many_lines)]
pub fn sample_questions() -> Result<Vec<Question>, QuestionError> {
    use QuestionKind::{MultiSelect, MultipleChoice, TrueFalse};

    Ok(vec![
        question(
            1,
            "Substantive due process focuses on fair procedures in legal sanctions",
            &["True", "False"],
            AnswerKey::Single(1),
            TrueFalse,
            "Constitution",
        )?,
        question(
            2,
            "Which amendment protects freedom of speech?",
            &[
                "First Amendment",
                "Second Amendment",
                "Third Amendment",
                "Fourth Amendment",
            ],
            AnswerKey::Single(0),
            MultipleChoice,
            "Constitution",
        )?,
        question(
            3,
            "The Bill of Rights consists of the first 10 amendments to the Constitution",
            &["True", "False"],
            AnswerKey::Single(0),
            TrueFalse,
            "Constitution",
        )?,
        question(
            4,
            "World War II ended in which year?",
            &["1944", "1945", "1946", "1947"],
            AnswerKey::Single(1),
            MultipleChoice,
            "History",
        )?,
        question(
            5,
            "Who was the first President of the United States?",
            &[
                "Thomas Jefferson",
                "George Washington",
                "John Adams",
                "Benjamin Franklin",
            ],
            AnswerKey::Single(1),
            MultipleChoice,
            "History",
        )?,
        question(
            6,
            "The Declaration of Independence was signed in 1776",
            &["True", "False"],
            AnswerKey::Single(0),
            TrueFalse,
            "History",
        )?,
        question(
            7,
            "How many senators does each state have?",
            &["1", "2", "3", "Depends on population"],
            AnswerKey::Single(1),
            MultipleChoice,
            "Government",
        )?,
        question(
            8,
            "The president can serve unlimited terms",
            &["True", "False"],
            AnswerKey::Single(1),
            TrueFalse,
            "Government",
        )?,
        question(
            9,
            "Which of the following are branches of the federal government?",
            &["Executive", "Legislative", "Judicial", "Electoral"],
            AnswerKey::multiple([0, 1, 2]),
            MultiSelect,
            "Government",
        )?,
        question(
            10,
            "Which court is the highest in the United States?",
            &[
                "Federal Court",
                "District Court",
                "Appeals Court",
                "Supreme Court",
            ],
            AnswerKey::Single(3),
            MultipleChoice,
            "Law",
        )?,
        question(
            11,
            "Double jeopardy means being tried twice for the same crime",
            &["True", "False"],
            AnswerKey::Single(0),
            TrueFalse,
            "Law",
        )?,
        question(
            12,
            "Which of these rights are part of a Miranda warning?",
            &[
                "The right to remain silent",
                "The right to an attorney",
                "The right to a speedy trial",
                "The right to bear arms",
            ],
            AnswerKey::multiple([0, 1]),
            MultiSelect,
            "Law",
        )?,
    ])
}
