use std::path::{Path, PathBuf};

use anyhow::Context;
use bloodwork_core::{AnalysisConfig, Report, Sex};
use bloodwork_intake::review::{review_report, PatientInfo, SummaryProvider};
use bloodwork_intake::{analyze_json_str, analyze_text_str};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bloodwork-cli",
    about = "Phân tích báo cáo xét nghiệm máu từ văn bản hoặc JSON."
)]
struct Args {
    /// Đường dẫn tới file báo cáo (văn bản hoặc JSON).
    #[arg(short, long)]
    input: PathBuf,

    /// Định dạng đầu vào; `auto` đoán theo phần mở rộng và nội dung.
    #[arg(short, long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Giới tính để chọn khoảng tham chiếu riêng (male/female).
    #[arg(long)]
    sex: Option<Sex>,

    /// Tuổi bệnh nhân, chỉ dùng cho phần nhận xét.
    #[arg(long)]
    age: Option<u32>,

    /// File JSON ghi đè một phần cấu hình ngưỡng.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Thêm nhận xét tổng hợp theo luật.
    #[arg(long)]
    review: bool,

    /// In toàn bộ báo cáo dạng JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Auto,
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };

    let format = resolve_format(args.format, &args.input, &data);
    tracing::debug!(?format, input = ?args.input, "input format resolved");

    let report = match format {
        InputFormat::Json => analyze_json_str(&data, args.sex, &config),
        _ => analyze_text_str(&data, args.sex, &config),
    }
    .with_context(|| format!("Không phân tích được {:?}", args.input))?;

    let review = if args.review {
        let patient = PatientInfo {
            sex: args.sex,
            age: args.age,
        };
        let summarizer = SummaryProvider::LocalRuleBased.summarizer();
        review_report(&report, &patient, Some(summarizer.as_ref()))?
    } else {
        None
    };

    if args.json {
        let output = match review {
            Some(review) => serde_json::json!({ "report": report, "review": review }),
            None => serde_json::to_value(&report)?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report);
        if let Some(review) = review {
            println!("\n{review}");
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("Cấu hình không hợp lệ {path:?}"))
}

fn resolve_format(format: InputFormat, path: &Path, data: &str) -> InputFormat {
    if format != InputFormat::Auto {
        return format;
    }
    let is_json_file = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let trimmed = data.trim_start();
    if is_json_file || trimmed.starts_with('{') || trimmed.starts_with('[') {
        InputFormat::Json
    } else {
        InputFormat::Text
    }
}

fn print_report(report: &Report) {
    let counts = report.summary.counts();
    println!(
        "Summary: {} Critical, {} High, {} Low",
        counts.critical, counts.high, counts.low
    );

    if !report.summary.interpretations.is_empty() {
        println!("\n[Interpretations]");
        for interpretation in &report.summary.interpretations {
            println!("- {interpretation}");
        }
    }

    println!("\n[Quality Assessment]");
    if report.quality.is_reliable {
        println!("No consistency issues detected.");
    }
    for issue in &report.quality.issues {
        println!("! {issue}");
    }
    for note in &report.quality.notes {
        println!("  {note}");
    }

    println!("\n[Detailed Table]");
    println!("{:<24} | {:<10} | {:<10} | {:<17}", "Parameter", "Value", "Unit", "Status");
    println!("{}", "-".repeat(70));
    for result in &report.results {
        println!(
            "{:<24} | {:<10} | {:<10} | {:<17}",
            result.name,
            result.raw_value.to_string(),
            result.unit,
            result.status.label()
        );
    }
}
