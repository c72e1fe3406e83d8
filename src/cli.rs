// src/cli.rs
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::account::{AccountClient, FeedbackRequest};
use crate::environment::EnvironmentConfig;
use crate::session::client::{GuestApi, GuestClient};
use crate::session::flow::{AnalyzeFlow, FlowError, FlowStep};
use crate::session::progress::ProgressTicker;
use crate::session::store::{CredentialStore, FileCredentialStore};
use crate::templates::preview::preview_text;
use crate::templates::{EditorSession, TemplateClient};
use crate::types::analysis::AnalysisResult;
use crate::types::resume::{StructuredResume, TemplateKind};
use crate::utils::validate_resume_file;

const PROGRESS_STAGE_INTERVAL: Duration = Duration::from_millis(900);

#[derive(Parser)]
#[command(name = "cvlens")]
#[command(about = "Analyze resumes against job descriptions from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a resume analysis as a guest
    Analyze {
        resume: PathBuf,
        /// Job description text
        #[arg(long, conflicts_with = "job_file")]
        job_description: Option<String>,
        /// Read the job description from a file instead
        #[arg(long)]
        job_file: Option<PathBuf>,
        #[arg(long)]
        job_title: Option<String>,
        #[arg(long)]
        company: Option<String>,
    },
    /// Inspect or reset the stored guest session
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Fetch a previous analysis by id
    Result { analysis_id: String },
    /// List available document templates
    Templates {
        #[arg(value_enum, default_value = "resume")]
        kind: TemplateKindArg,
    },
    /// Edit and render the structured resume behind an analysis
    Edit {
        #[command(subcommand)]
        command: EditCommand,
    },
    /// Send product feedback
    Feedback {
        message: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show or change marketing email preferences
    EmailPrefs {
        #[command(subcommand)]
        command: EmailPrefsCommand,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Show the stored guest session and its server-side state
    Info,
    /// Forget the stored guest session
    Reset,
}

#[derive(Subcommand)]
pub enum EditCommand {
    /// Summarize the structured resume
    Show { analysis_id: String },
    /// Print the value at a dotted path (e.g. experience.0.title)
    Get { analysis_id: String, path: String },
    /// Apply one or more path=value edits, then save
    Set {
        analysis_id: String,
        #[arg(required = true)]
        edits: Vec<String>,
    },
    /// Insert a value at a path (array indices shift), then save
    Insert {
        analysis_id: String,
        path: String,
        value: String,
    },
    /// Remove the value at a path, then save
    Remove { analysis_id: String, path: String },
    /// Render a template preview as terminal text
    Preview {
        analysis_id: String,
        #[arg(long, default_value = "default")]
        template: String,
    },
    /// Render the PDF and save it to the output directory
    Download {
        analysis_id: String,
        #[arg(long, default_value = "default")]
        template: String,
    },
}

#[derive(Subcommand)]
pub enum EmailPrefsCommand {
    /// Show current preferences
    Show,
    /// Update individual categories
    Set {
        #[arg(long)]
        product_updates: Option<bool>,
        #[arg(long)]
        tips_and_guides: Option<bool>,
        #[arg(long)]
        promotions: Option<bool>,
    },
    /// Disable every email category
    UnsubscribeAll,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TemplateKindArg {
    Resume,
    CoverLetter,
}

impl From<TemplateKindArg> for TemplateKind {
    fn from(kind: TemplateKindArg) -> Self {
        match kind {
            TemplateKindArg::Resume => TemplateKind::Resume,
            TemplateKindArg::CoverLetter => TemplateKind::CoverLetter,
        }
    }
}

pub async fn handle_command(cli: Cli, config: EnvironmentConfig) -> Result<()> {
    match cli.command {
        Command::Analyze {
            resume,
            job_description,
            job_file,
            job_title,
            company,
        } => {
            let job_description = match (job_description, job_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read job file: {}", path.display()))?,
                (None, None) => {
                    anyhow::bail!("Provide a job description with --job-description or --job-file")
                }
            };

            run_analysis(&config, resume, job_description, job_title, company).await
        }

        Command::Session { command } => handle_session_command(command, &config).await,

        Command::Result { analysis_id } => {
            let token = resolve_token(&config).await?;
            let api = GuestClient::new(config.api_base_url.clone())?;
            match api.analysis(&token, &analysis_id).await {
                Ok(result) => {
                    render_analysis(&result);
                    Ok(())
                }
                Err(e) => anyhow::bail!("Could not fetch analysis {}: {}", analysis_id, e),
            }
        }

        Command::Templates { kind } => {
            let client = template_client(&config).await?;
            let templates = client.list_templates(kind.into()).await?;
            if templates.is_empty() {
                println!("No templates available.");
            } else {
                println!("{:<16} {:<24} Description", "ID", "Name");
                println!("{}", "-".repeat(72));
                for template in templates {
                    println!(
                        "{:<16} {:<24} {}",
                        template.id,
                        template.name,
                        template.description.unwrap_or_default()
                    );
                }
            }
            Ok(())
        }

        Command::Edit { command } => handle_edit_command(command, &config).await,

        Command::Feedback {
            message,
            category,
            email,
        } => {
            let client =
                AccountClient::new(config.api_base_url.clone(), EnvironmentConfig::auth_token())?;
            client
                .submit_feedback(&FeedbackRequest {
                    category,
                    message,
                    email,
                })
                .await?;
            println!("✓ Feedback sent. Thank you!");
            Ok(())
        }

        Command::EmailPrefs { command } => {
            let client =
                AccountClient::new(config.api_base_url.clone(), EnvironmentConfig::auth_token())?;
            match command {
                EmailPrefsCommand::Show => {
                    let preferences = client.email_preferences().await?;
                    println!("Product updates: {}", on_off(preferences.product_updates));
                    println!("Tips and guides: {}", on_off(preferences.tips_and_guides));
                    println!("Promotions:      {}", on_off(preferences.promotions));
                }
                EmailPrefsCommand::Set {
                    product_updates,
                    tips_and_guides,
                    promotions,
                } => {
                    let mut preferences = client.email_preferences().await?;
                    if let Some(flag) = product_updates {
                        preferences.product_updates = flag;
                    }
                    if let Some(flag) = tips_and_guides {
                        preferences.tips_and_guides = flag;
                    }
                    if let Some(flag) = promotions {
                        preferences.promotions = flag;
                    }
                    client.update_email_preferences(&preferences).await?;
                    println!("✓ Email preferences updated");
                }
                EmailPrefsCommand::UnsubscribeAll => {
                    client.unsubscribe_all().await?;
                    println!("✓ Unsubscribed from all marketing email");
                }
            }
            Ok(())
        }
    }
}

async fn run_analysis(
    config: &EnvironmentConfig,
    resume: PathBuf,
    job_description: String,
    job_title: Option<String>,
    company_name: Option<String>,
) -> Result<()> {
    validate_resume_file(&resume)?;

    let api = GuestClient::new(config.api_base_url.clone())?;
    let store = FileCredentialStore::new(config.credentials_file()?);
    let cancel = CancellationToken::new();
    let mut flow = AnalyzeFlow::new(api, store, cancel);

    flow.bootstrap().await;
    if flow.step() == FlowStep::Welcome {
        if let Some(error) = flow.error() {
            render_flow_error(error);
        }
        return Ok(());
    }

    println!("Guest session ready — {} free analyses left", flow.credits());

    flow.form.resume = Some(resume);
    flow.form.job_description = job_description;
    flow.form.job_title = job_title;
    flow.form.company_name = company_name;

    if !flow.form.can_submit() {
        anyhow::bail!("Both a resume file and a job description are required");
    }

    // Cosmetic stage messages; only the real response below decides
    // when results render.
    let ticker = ProgressTicker::spawn(PROGRESS_STAGE_INTERVAL);
    flow.submit().await;
    ticker.finish();

    match flow.step() {
        FlowStep::Results => {
            if let Some(result) = flow.result() {
                render_analysis(result);
            }
            println!("\nCredits remaining: {}", flow.credits());
        }
        _ => {
            if let Some(error) = flow.error() {
                render_flow_error(error);
            }
            println!("Credits remaining: {}", flow.credits());
        }
    }

    Ok(())
}

async fn handle_session_command(
    command: SessionCommand,
    config: &EnvironmentConfig,
) -> Result<()> {
    let store = FileCredentialStore::new(config.credentials_file()?);

    match command {
        SessionCommand::Info => match store.get() {
            None => println!("No guest session stored."),
            Some(credentials) => {
                println!("Session id: {}", credentials.guest_session_id);
                println!("Expires at: {}", credentials.guest_expires_at);

                if !credentials.is_valid_at(Utc::now()) {
                    println!("Status:     expired locally");
                } else {
                    let api = GuestClient::new(config.api_base_url.clone())?;
                    match api.session_info(&credentials.guest_token).await {
                        Ok(snapshot) => {
                            println!("Status:     active");
                            println!("Credits:    {}", snapshot.credits);
                        }
                        Err(e) => println!("Status:     rejected by server ({})", e),
                    }
                }
            }
        },
        SessionCommand::Reset => {
            store.clear()?;
            println!("✓ Guest session cleared");
        }
    }

    Ok(())
}

async fn handle_edit_command(command: EditCommand, config: &EnvironmentConfig) -> Result<()> {
    match command {
        EditCommand::Show { analysis_id } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            render_resume_summary(&StructuredResume::from_value(&data));
        }

        EditCommand::Get { analysis_id, path } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            match crate::templates::editor::get_path(&data, &path) {
                Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
                None => println!("Nothing at '{}'", path),
            }
        }

        EditCommand::Set { analysis_id, edits } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            let mut session = EditorSession::new(data);

            for edit in &edits {
                let (path, value) = parse_edit(edit)?;
                session.set(&path, value)?;
            }

            let snapshot = session.snapshot().await;
            client
                .save_structured_resume(&analysis_id, &snapshot)
                .await?;
            println!("✓ Applied {} edit(s) and saved", edits.len());
        }

        EditCommand::Insert {
            analysis_id,
            path,
            value,
        } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            let mut session = EditorSession::new(data);

            session.insert(&path, parse_value(&value))?;
            let snapshot = session.snapshot().await;
            client
                .save_structured_resume(&analysis_id, &snapshot)
                .await?;
            println!("✓ Inserted at '{}' and saved", path);
        }

        EditCommand::Remove { analysis_id, path } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            let mut session = EditorSession::new(data);

            session.remove(&path)?;
            let snapshot = session.snapshot().await;
            client
                .save_structured_resume(&analysis_id, &snapshot)
                .await?;
            println!("✓ Removed '{}' and saved", path);
        }

        EditCommand::Preview {
            analysis_id,
            template,
        } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            let html = client.preview_html(&analysis_id, &template, &data).await?;
            println!("{}", preview_text(&html)?);
        }

        EditCommand::Download {
            analysis_id,
            template,
        } => {
            let client = template_client(config).await?;
            let data = client.ensure_structured_resume(&analysis_id).await?;
            let path = client
                .download_pdf(&analysis_id, &template, &data, &config.output_path)
                .await?;
            println!("✓ Saved {}", path.display());
        }
    }

    Ok(())
}

/// Bearer token for template and analysis lookups: the signed-in
/// account token when configured, otherwise the guest session
/// (bootstrapping one if needed).
async fn resolve_token(config: &EnvironmentConfig) -> Result<String> {
    if let Some(token) = EnvironmentConfig::auth_token() {
        return Ok(token);
    }

    let store = FileCredentialStore::new(config.credentials_file()?);
    if store.is_valid() {
        if let Some(credentials) = store.get() {
            return Ok(credentials.guest_token);
        }
    }

    let api = GuestClient::new(config.api_base_url.clone())?;
    let mut flow = AnalyzeFlow::new(api, store, CancellationToken::new());
    flow.bootstrap().await;

    match flow.session_token() {
        Some(token) => Ok(token.to_string()),
        None => {
            let message = flow
                .error()
                .map(|e| e.error.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("Could not start a guest session: {}", message)
        }
    }
}

async fn template_client(config: &EnvironmentConfig) -> Result<TemplateClient> {
    let token = resolve_token(config).await?;
    TemplateClient::new(config.api_base_url.clone(), token)
}

fn parse_edit(edit: &str) -> Result<(String, Value)> {
    let (path, raw) = edit
        .split_once('=')
        .with_context(|| format!("Expected path=value, got '{}'", edit))?;
    Ok((path.to_string(), parse_value(raw)))
}

/// Values parse as JSON where possible so numbers, booleans and arrays
/// come through typed; anything else is a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn render_flow_error(error: &FlowError) {
    println!("❌ {}", error.error);
    for action in &error.actions {
        println!("   → {}", action.label());
    }
}

fn render_analysis(result: &AnalysisResult) {
    println!("✓ Analysis complete");

    if let Some(score) = result.overall_score {
        println!("  Overall score: {:.0}%", score);
    }

    if let Some(analysis) = &result.match_analysis {
        if let Some(summary) = &analysis.summary {
            println!("\n{}", summary);
        }
        if let Some(strengths) = &analysis.strengths {
            if !strengths.is_empty() {
                println!("\nStrengths:");
                for strength in strengths {
                    println!("  + {}", strength);
                }
            }
        }
        if let Some(gaps) = &analysis.gaps {
            if !gaps.is_empty() {
                println!("\nGaps:");
                for gap in gaps {
                    println!("  - {}", gap);
                }
            }
        }
    }

    if let Some(breakdown) = &result.score_breakdown {
        if !breakdown.is_empty() {
            println!("\nScore breakdown:");
            for (name, value) in breakdown {
                println!("  {:<24} {}", name, value);
            }
        }
    }

    if let Some(recommendations) = &result.recommendations {
        if !recommendations.is_empty() {
            println!("\nRecommendations:");
            for recommendation in recommendations {
                let title = recommendation.title.as_deref().unwrap_or("(untitled)");
                match &recommendation.priority {
                    Some(priority) => println!("  • {} [{}]", title, priority),
                    None => println!("  • {}", title),
                }
                if let Some(description) = &recommendation.description {
                    println!("    {}", description);
                }
            }
        }
    }

    if let Some(id) = &result.id {
        println!("\nAnalysis id: {}", id);
    }
}

fn render_resume_summary(resume: &StructuredResume) {
    if let Some(contact) = &resume.contact {
        if let Some(name) = &contact.name {
            println!("{}", name);
        }
        let details: Vec<&str> = [&contact.email, &contact.phone, &contact.location]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .collect();
        if !details.is_empty() {
            println!("{}", details.join(" · "));
        }
    }

    if let Some(experience) = &resume.experience {
        println!("\nExperience:");
        for (index, entry) in experience.iter().enumerate() {
            println!(
                "  [{}] {} at {} ({} – {})",
                index,
                entry.title.as_deref().unwrap_or("?"),
                entry.company.as_deref().unwrap_or("?"),
                entry.start_date.as_deref().unwrap_or("?"),
                entry.end_date.as_deref().unwrap_or("present"),
            );
        }
    }

    if let Some(education) = &resume.education {
        println!("\nEducation:");
        for (index, entry) in education.iter().enumerate() {
            println!(
                "  [{}] {} — {}",
                index,
                entry.degree.as_deref().unwrap_or("?"),
                entry.institution.as_deref().unwrap_or("?"),
            );
        }
    }

    if let Some(skills) = &resume.skills {
        if !skills.is_empty() {
            println!("\nSkills: {}", skills.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_splits_on_first_equals() {
        let (path, value) = parse_edit("experience.0.title=\"Senior Engineer\"").unwrap();
        assert_eq!(path, "experience.0.title");
        assert_eq!(value, Value::String("Senior Engineer".to_string()));

        let (_, value) = parse_edit("contact.note=a=b").unwrap();
        assert_eq!(value, Value::String("a=b".to_string()));

        assert!(parse_edit("no-equals-here").is_err());
    }

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("3"), Value::from(3));
        assert_eq!(parse_value("true"), Value::from(true));
        assert_eq!(parse_value("[1, 2]"), serde_json::json!([1, 2]));
        // Bare words are strings.
        assert_eq!(parse_value("Engineer"), Value::String("Engineer".to_string()));
    }
}
