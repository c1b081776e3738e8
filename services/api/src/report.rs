use clap::Args;
use wisebites::config::AppConfig;
use wisebites::error::AppError;
use wisebites::scoring::{ReviewSignal, ScoreBreakdown, ScoreEngine, ScoreInputs};

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// AI safety score (0-10) produced by review analysis
    #[arg(long)]
    pub(crate) ai_score: Option<f64>,
    /// Number of relevant third-party reviews
    #[arg(long)]
    pub(crate) relevant_count: Option<u32>,
    /// Average third-party star rating (0-5)
    #[arg(long, default_value_t = 0.0)]
    pub(crate) average_rating: f64,
    /// Community review as RATING:safe or RATING:unsafe, e.g. 5:safe. Repeatable.
    #[arg(long = "review", value_parser = crate::infra::parse_review_signal)]
    pub(crate) reviews: Vec<ReviewSignal>,
    /// Print the breakdown as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score_report(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = ScoreEngine::new(config.scoring);

    let json = args.json;
    let inputs = score_inputs(args);
    let breakdown = engine.explain(&inputs);

    if json {
        match serde_json::to_string_pretty(&breakdown) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => return Err(AppError::Io(err.into())),
        }
    } else {
        render_breakdown(&inputs, &breakdown);
    }
    Ok(())
}

pub(crate) fn score_inputs(args: ScoreArgs) -> ScoreInputs {
    ScoreInputs {
        ai_score: args.ai_score,
        relevant_count: args.relevant_count,
        average_rating: args.average_rating,
        community: args.reviews,
    }
}

fn render_breakdown(inputs: &ScoreInputs, breakdown: &ScoreBreakdown) {
    println!("WiseBites score");
    match inputs.ai_score {
        Some(ai_score) => println!("  AI safety score: {ai_score:.1}"),
        None => println!("  AI safety score: not analysed"),
    }
    println!(
        "  Community reviews: {} | relevant third-party reviews: {}",
        inputs.community.len(),
        inputs.relevant_count.unwrap_or(0)
    );

    println!("\nPath: {}", breakdown.path.label());
    for component in &breakdown.components {
        println!("  {:>+7.1}  {}", component.points, component.notes);
    }

    match (breakdown.score, breakdown.band) {
        (Some(score), Some(band)) => {
            println!("  raw {:.1} -> {score:.1} ({})", breakdown.raw, band.label());
        }
        _ => println!("  {}", breakdown.summary()),
    }
}
