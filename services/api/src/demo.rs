use crate::infra::parse_answer;
use clap::Args;
use fallrisk::assessment::scoring::Question;
use fallrisk::assessment::{AnswerSet, ScoringEngine};
use fallrisk::error::AppError;
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Answer as QUESTION=OPTION; repeat for each answered question.
    #[arg(long = "answer", value_parser = parse_answer)]
    pub(crate) answers: Vec<(u32, i64)>,
    /// Print only the JSON payload.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let wire: BTreeMap<String, i64> = args
        .answers
        .iter()
        .map(|(question, option)| (question.to_string(), *option))
        .collect();

    let answers = AnswerSet::from_wire(&wire)?;

    let outcome = ScoringEngine::new().score(&answers);
    let payload = json!({
        "total_score": outcome.total_score,
        "risk_level": outcome.risk_level,
        "recommendation": outcome.recommendation,
        "question_responses": answers,
    });

    if !args.json {
        println!("Fall risk self-assessment");
        println!(
            "- Score {} -> {} risk",
            outcome.total_score, outcome.risk_level
        );
        println!("  Recommendation: {}", outcome.recommendation);
        println!("  Contributions:");
        for contribution in &outcome.contributions {
            let weight = Question::from_id(contribution.question)
                .map(|question| question.weight())
                .unwrap_or_default();
            println!(
                "    - Q{}: option {} x weight {} = {}",
                contribution.question.0, contribution.option, weight, contribution.points
            );
        }
        let skipped = answers.len() - outcome.contributions.len();
        if skipped > 0 {
            println!("  Ignored {} answer(s) to unknown questions", skipped);
        }
    }

    match serde_json::to_string_pretty(&payload) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("Score payload unavailable: {}", err),
    }
    Ok(())
}
