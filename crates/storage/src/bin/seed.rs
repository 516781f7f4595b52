use std::fmt;

use chrono::{DateTime, Utc};
use storage::repository::Storage;
use theory_core::model::{
    Category, ChoiceIndex, LearningModule, ModuleId, ProgressRecord, Question, QuestionId,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    questions: u32,
    modules: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidQuestions { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("THEORY_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut questions = std::env::var("THEORY_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(24);
        let mut modules = true;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--no-modules" => {
                    modules = false;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions,
            modules,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --questions <n>           Number of sample questions to upsert (default: 24)");
    eprintln!("  --no-modules              Skip seeding the learning modules");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  THEORY_DB_URL, THEORY_QUESTIONS");
}

// One worked example per category; the seeder cycles through these,
// assigning fresh ids, until the requested count is reached.
const SAMPLE_QUESTIONS: [(Category, &str, [&str; 4], u8, Option<&str>); 8] = [
    (
        Category::Alertness,
        "You are on a long motorway journey and begin to feel drowsy. What should you do?",
        [
            "Stop at the next service area and rest",
            "Open a window and carry on",
            "Turn the radio up",
            "Speed up to finish the journey sooner",
        ],
        0,
        Some("Fresh air helps only for a short while. Plan rest stops on long journeys."),
    ),
    (
        Category::Attitude,
        "The driver behind is following too closely. What should you do?",
        [
            "Brake sharply to warn them",
            "Ease off and increase the gap to the vehicle ahead",
            "Accelerate away from them",
            "Signal left and wave them past",
        ],
        1,
        Some("A bigger gap in front gives both of you more time to react."),
    ),
    (
        Category::SafetyMargins,
        "In good dry conditions, what time gap should you leave to the vehicle in front?",
        [
            "One second",
            "At least two seconds",
            "At least four seconds",
            "One car length",
        ],
        1,
        Some("Use the two-second rule in the dry and double it in the wet."),
    ),
    (
        Category::HazardAwareness,
        "A ball bounces out from between parked cars ahead. What should you do?",
        [
            "Maintain your speed and sound the horn",
            "Slow down and be ready to stop",
            "Swerve onto the other side of the road",
            "Flash your headlights",
        ],
        1,
        Some("Where there is a ball there may be a child about to follow it."),
    ),
    (
        Category::VulnerableRoadUsers,
        "You are turning left into a side road where pedestrians are already crossing. What should you do?",
        [
            "Sound your horn",
            "Wave them across quickly",
            "Give way to them",
            "Drive through slowly",
        ],
        2,
        Some("Pedestrians who have started to cross have priority."),
    ),
    (
        Category::RoadSigns,
        "What shape is a stop sign?",
        ["Circle", "Triangle", "Octagon", "Square"],
        2,
        Some("The unique octagon stays recognisable even when the face is obscured."),
    ),
    (
        Category::RulesOfTheRoad,
        "On a three-lane motorway, which lane should you normally drive in?",
        [
            "The left-hand lane",
            "The middle lane",
            "The right-hand lane",
            "Whichever lane is emptiest",
        ],
        0,
        Some("Keep left unless you are overtaking."),
    ),
    (
        Category::MotorwayDriving,
        "What is the national speed limit for cars on a motorway?",
        ["60 mph", "70 mph", "80 mph", "50 mph"],
        1,
        None,
    ),
];

const SAMPLE_MODULES: [(Category, &str, &str); 8] = [
    (
        Category::Alertness,
        "Staying alert",
        "Observation, anticipation and managing fatigue at the wheel.",
    ),
    (
        Category::Attitude,
        "Sharing the road",
        "Consideration, priority and keeping your patience with other road users.",
    ),
    (
        Category::SafetyMargins,
        "Keeping your distance",
        "Separation distances, stopping distances and driving to the conditions.",
    ),
    (
        Category::HazardAwareness,
        "Reading the road",
        "Spotting developing hazards early and responding in good time.",
    ),
    (
        Category::VulnerableRoadUsers,
        "Looking out for others",
        "Pedestrians, cyclists, motorcyclists and horse riders.",
    ),
    (
        Category::RoadSigns,
        "Signs and signals",
        "Shapes, colours and meanings of signs and road markings.",
    ),
    (
        Category::RulesOfTheRoad,
        "Rules of the road",
        "Speed limits, lane discipline, junctions and parking.",
    ),
    (
        Category::MotorwayDriving,
        "Motorway driving",
        "Joining, lane use, breakdowns and smart motorway signals.",
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for i in 0..args.questions {
        let idx = (i as usize) % SAMPLE_QUESTIONS.len();
        let (category, prompt, choices, correct, explanation) = SAMPLE_QUESTIONS[idx];
        let question = Question::new(
            QuestionId::new(u64::from(i + 1)),
            category,
            prompt,
            choices.iter().map(ToString::to_string).collect(),
            ChoiceIndex::new(correct),
            explanation.map(ToString::to_string),
        )?;
        storage.questions.upsert_question(&question).await?;
    }

    let mut module_count = 0;
    if args.modules {
        for (i, (category, title, summary)) in SAMPLE_MODULES.iter().enumerate() {
            let module = LearningModule::new(
                ModuleId::new(i as u64 + 1),
                *category,
                *title,
                *summary,
            )?;
            storage.modules.upsert_module(&module).await?;
            module_count += 1;
        }
    }

    if storage.progress.load_progress().await?.is_none() {
        storage.progress.save_progress(&ProgressRecord::new(now)).await?;
    }

    println!(
        "Seeded {} questions and {} modules into {}",
        args.questions, module_count, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
