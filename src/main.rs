//! Command line front-end.
//!
//! Runs the same load -> select -> submit flow as the browser page.
//! Coordinates are given in display pixels of the image as fitted to
//! `--viewport-width`, exactly as a browser user would click them.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result, bail};
    use clap::{Args, Parser, Subcommand};

    use maskpick::config::AppConfig;
    use maskpick::constants::DEFAULT_VIEWPORT_WIDTH;
    use maskpick::geometry::DisplayPoint;
    use maskpick::prompt::SegmentPrompt;
    use maskpick::render;
    use maskpick::selection::PointLabel;
    use maskpick::{
        HttpBackend, ImageFile, PointerButton, SelectionMode, Session, SessionSettings,
    };

    #[derive(Parser, Debug)]
    #[command(name = "maskpick-cli", version, about = "Request segmentation masks for image regions")]
    pub struct Cli {
        /// Configuration file (defaults to the user config directory)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long, global = true)]
        verbose: bool,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Send a selection to the segmentation service and save the mask
        Segment {
            #[command(flatten)]
            target: TargetArgs,

            /// Where to write the mask (default: the suggested download name)
            #[arg(short, long)]
            output: Option<PathBuf>,

            /// Override the configured service base URL
            #[arg(long)]
            backend_url: Option<String>,

            /// Only print the scaled request; do not contact the service
            #[arg(long)]
            dry_run: bool,
        },
        /// Draw the selection overlay to a PNG without submitting
        Render {
            #[command(flatten)]
            target: TargetArgs,

            /// Where to write the overlay
            #[arg(short, long, default_value = "overlay.png")]
            output: PathBuf,
        },
        /// Manage the configuration file
        Config {
            #[command(subcommand)]
            action: ConfigAction,
        },
    }

    #[derive(Subcommand, Debug)]
    enum ConfigAction {
        /// Write the default configuration
        Init {
            /// Overwrite an existing file
            #[arg(long)]
            force: bool,
        },
        /// Print the effective configuration
        Show,
    }

    #[derive(Args, Debug)]
    struct TargetArgs {
        /// Image to segment
        image: PathBuf,

        /// Width of the viewport the image is fitted into
        #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
        viewport_width: u32,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Color tolerance (color mode)
        #[arg(long)]
        tolerance: Option<f64>,
    }

    #[derive(Args, Debug)]
    #[group(required = true, multiple = false)]
    struct SelectionArgs {
        /// Tap at X,Y[,LABEL]; LABEL 0 marks background. Repeatable.
        #[arg(long = "point", value_name = "X,Y[,LABEL]", value_parser = parse_point)]
        points: Vec<(f64, f64, PointLabel)>,

        /// Drag a box between two corners
        #[arg(long = "box", value_name = "X1,Y1,X2,Y2", value_parser = parse_box)]
        bbox: Option<(f64, f64, f64, f64)>,

        /// Sample the color at X,Y
        #[arg(long, value_name = "X,Y", value_parser = parse_xy)]
        color: Option<(f64, f64)>,
    }

    fn parse_numbers(s: &str, min: usize, max: usize) -> Result<Vec<f64>, String> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid number in '{}': {}", s, e))?;
        if values.len() < min || values.len() > max {
            return Err(format!("expected {} to {} comma-separated numbers", min, max));
        }
        Ok(values)
    }

    fn parse_xy(s: &str) -> Result<(f64, f64), String> {
        let v = parse_numbers(s, 2, 2)?;
        Ok((v[0], v[1]))
    }

    fn parse_point(s: &str) -> Result<(f64, f64, PointLabel), String> {
        let v = parse_numbers(s, 2, 3)?;
        let label = match v.get(2) {
            None => PointLabel::Foreground,
            Some(&l) => (l.fract() == 0.0 && (0.0..=255.0).contains(&l))
                .then(|| PointLabel::from_value(l as u8))
                .flatten()
                .ok_or_else(|| format!("label must be 0 or 1, got {}", l))?,
        };
        Ok((v[0], v[1], label))
    }

    fn parse_box(s: &str) -> Result<(f64, f64, f64, f64), String> {
        let v = parse_numbers(s, 4, 4)?;
        Ok((v[0], v[1], v[2], v[3]))
    }

    fn load_config(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => AppConfig::load_from_path(path)
                .with_context(|| format!("loading configuration from {}", path.display())),
            None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
        }
    }

    /// Load the image and replay the selection as pointer gestures.
    fn prepare_session(config: &AppConfig, target: &TargetArgs) -> Result<Session> {
        let mut session = Session::new(SessionSettings::from(config), target.viewport_width);
        let file = ImageFile::read(&target.image)
            .with_context(|| format!("reading {}", target.image.display()))?;
        session.load_image(Some(file))?;

        if let Some(image) = session.image() {
            let display = image.display();
            let natural = image.natural();
            let scale = image.scale_factor();
            println!(
                "Image {}x{} shown at {}x{} (scale {:.3} x {:.3})",
                natural.width, natural.height, display.width, display.height, scale.x, scale.y
            );
        }

        if let Some(tolerance) = target.tolerance {
            session.set_tolerance(tolerance);
        }

        let sel = &target.selection;
        if !sel.points.is_empty() {
            session.set_mode(SelectionMode::PointTap);
            for &(x, y, label) in &sel.points {
                let button = match label {
                    PointLabel::Background => PointerButton::Secondary,
                    PointLabel::Foreground => PointerButton::Primary,
                };
                session.pointer_down(DisplayPoint::new(x, y), button);
            }
        } else if let Some((x1, y1, x2, y2)) = sel.bbox {
            session.set_mode(SelectionMode::BoxDrag);
            let end = DisplayPoint::new(x2, y2);
            session.pointer_down(DisplayPoint::new(x1, y1), PointerButton::Primary);
            session.pointer_move(end);
            session.pointer_up(end);
        } else if let Some((x, y)) = sel.color {
            session.set_mode(SelectionMode::ColorSample);
            session.pointer_down(DisplayPoint::new(x, y), PointerButton::Primary);
        }

        if !session.can_submit() {
            bail!("the selection is empty (a box needs nonzero width and height)");
        }
        Ok(session)
    }

    async fn segment(
        config: &AppConfig,
        target: &TargetArgs,
        output: Option<PathBuf>,
        dry_run: bool,
    ) -> Result<()> {
        let mut session = prepare_session(config, target)?;

        if let Some(image) = session.image() {
            if let Some(prompt) = session
                .selection()
                .scale_to_original(image.natural(), image.display())
            {
                println!("Selection in image pixels: {}", prompt);
            }
        }

        if dry_run {
            let request = session.begin_submit()?;
            println!(
                "POST {}",
                config.backend.url_for(request.prompt.endpoint())
            );
            println!("  {} = {}", request.prompt.file_field(), request.file_name);
            for (name, value) in request.prompt.text_fields()? {
                println!("  {} = {}", name, value);
            }
            return Ok(());
        }

        let backend = HttpBackend::new(config.backend.clone())?;
        let mask = session.submit(&backend).await?;

        let path = output.unwrap_or_else(|| PathBuf::from(mask.file_name()));
        mask.save(&path)
            .with_context(|| format!("writing mask to {}", path.display()))?;
        match mask.dimensions() {
            Some((w, h)) => println!("Saved {}x{} mask to {}", w, h, path.display()),
            None => println!("Saved mask to {}", path.display()),
        }
        Ok(())
    }

    fn render_overlay(config: &AppConfig, target: &TargetArgs, output: &Path) -> Result<()> {
        let session = prepare_session(config, target)?;
        let pixmap = session.render().context("nothing to render")?;
        render::pixmap_to_rgba(&pixmap)
            .save(output)
            .with_context(|| format!("writing overlay to {}", output.display()))?;
        println!("Saved overlay to {}", output.display());
        Ok(())
    }

    fn refuse_overwrite(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Ok(())
    }

    fn config_command(path: Option<&Path>, action: ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Init { force } => {
                let config = AppConfig::default();
                let written = match path {
                    Some(path) => {
                        refuse_overwrite(path, force)?;
                        config.save_to_path(path)?;
                        path.to_path_buf()
                    }
                    None => {
                        if let Some(existing) = AppConfig::default_path() {
                            refuse_overwrite(&existing, force)?;
                        }
                        config.save_to_default_path()?
                    }
                };
                println!("Wrote {}", written.display());
            }
            ConfigAction::Show => {
                println!("{}", load_config(path)?.to_json()?);
            }
        }
        Ok(())
    }

    pub async fn run(cli: Cli) -> Result<()> {
        let Cli {
            config: config_path,
            verbose,
            command,
        } = cli;

        let mut config = match &command {
            Command::Config { .. } => AppConfig::default(),
            _ => load_config(config_path.as_deref())?,
        };
        let level = if verbose {
            log::LevelFilter::Debug
        } else {
            config.preferences.log_level.to_level_filter()
        };
        maskpick::logging::init(level);

        match command {
            Command::Segment {
                target,
                output,
                backend_url,
                dry_run,
            } => {
                if let Some(url) = backend_url {
                    config.backend.base_url = url;
                }
                segment(&config, &target, output, dry_run).await
            }
            Command::Render { target, output } => render_overlay(&config, &target, &output),
            Command::Config { action } => config_command(config_path.as_deref(), action),
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    cli::run(cli::Cli::parse()).await
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
