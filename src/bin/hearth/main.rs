use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, Parser, Subcommand, builder::Styles, crate_description, crate_version};
use color_eyre::eyre::{Result, WrapErr};
use hearth::{
    http,
    templates::{TemplateConfig, Templates, View},
    views::Renderer,
};

/// Clap v3 style (approximate)
/// See https://stackoverflow.com/a/75343828
fn style() -> clap::builder::Styles {
    Styles::styled()
        .usage(
            anstyle::Style::new()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)))
                .bold(),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
}

/// The root object for parsing CLI arguments.
///
/// Subcommands and flags and hierarchically defined below this.
#[derive(Parser)]
#[command(
	version,
	about = format!("{} v{}", crate_description!(), crate_version!()),
	styles(style()),
	disable_colored_help(false),
	arg_required_else_help(true)
)]
struct CliArguments {
    #[command(flatten)]
    pub templates: TemplateArgs,

    #[command(subcommand)]
    pub subcommand: ToplevelCommmands,
}

/// Where templates are loaded from and how pages are branded.
///
/// Flags take precedence over values from the config file.
#[derive(Args)]
struct TemplateArgs {
    /// JSON file with `dir`, `logoURL` and `issuerName` keys.
    #[arg(long, env = "HEARTH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory of templates to use instead of the built-in ones.
    #[arg(long, env = "HEARTH_TEMPLATES_DIR", global = true)]
    templates_dir: Option<PathBuf>,

    /// URL of the logo shown on every page.
    #[arg(long, env = "HEARTH_LOGO_URL", global = true)]
    logo_url: Option<String>,

    /// Issuer name shown on every page.
    #[arg(long, env = "HEARTH_ISSUER", global = true)]
    issuer: Option<String>,
}

/// The top-level commands available to the CLI.
#[derive(Subcommand)]
enum ToplevelCommmands {
    /// Serve previews of every view.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "HEARTH_LISTEN", default_value = "0.0.0.0:3000")]
        listen: String,
    },
    /// Load the templates and report any problems.
    Check,
}

impl TemplateArgs {
    /// Builds the template config from the config file and flags.
    fn template_config(&self) -> Result<TemplateConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => TemplateConfig::default(),
        };

        if let Some(dir) = &self.templates_dir {
            config.dir = Some(dir.clone());
        }
        if let Some(logo_url) = &self.logo_url {
            config.logo_url = Some(logo_url.clone());
        }
        if let Some(issuer) = &self.issuer {
            config.issuer = Some(issuer.clone());
        }

        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<TemplateConfig> {
    let file =
        File::open(path).wrap_err_with(|| format!("failed to open config {}", path.display()))?;

    // Report the key path of a bad value, not just the line and column.
    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));
    let config = serde_path_to_error::deserialize(&mut deserializer)
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    dotenv::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli_args = CliArguments::parse();

    let config = cli_args.templates.template_config()?;

    // Refuse to start with an incomplete or broken template set.
    let templates = Templates::load(&config).wrap_err("failed to load templates")?;

    match cli_args.subcommand {
        ToplevelCommmands::Check => {
            for view in View::ALL {
                println!("ok  {view}");
            }
            println!("logo   {}", templates.global().logo_url);
            println!("issuer {}", templates.global().issuer);
        }
        ToplevelCommmands::Serve { listen } => {
            let renderer = Renderer::new(Arc::new(templates));

            let app = http::make_app_router(renderer);

            let listener = tokio::net::TcpListener::bind(&listen)
                .await
                .wrap_err_with(|| format!("failed to listen on {listen}"))?;

            tracing::info!(%listen, "serving view previews");

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
