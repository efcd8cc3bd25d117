//! Command-line driver: runs a scripted annotation session against a dataset
//! directory.
//!
//! Commands are read from stdin, one per line:
//!
//! ```text
//! images                 list the dataset's images
//! classes                list the dataset's classes with their colors
//! open <image>           switch to an image
//! down <x> <y>           pointer pressed (container coordinates)
//! move <x> <y>           pointer moved
//! up [<x> <y>]           pointer released
//! key <combo>            key press, e.g. "e", "ctrl+z", "Delete"
//! class <id>             make a class current
//! clear                  remove every box (undoable)
//! tick <ms>              wait, then let pending saves run
//! list                   print the boxes
//! status                 print mode, class and save state
//! quit
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use web_time::Instant;

use boxmark::backend::{BackendError, YoloDirBackend};
use boxmark::config::{AppConfig, ConfigError};
use boxmark::input::KeyEvent;
use boxmark::interaction::{InteractionController, KeyResult};
use boxmark::model::{DrawMode, ImageDimensions, ImageKey, ScreenPoint};
use boxmark::session::AnnotationSession;
use boxmark::sync::ThreadedExecutor;
use boxmark::transform::ImageLayout;

/// Time allowed for loads and the final flush.
const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Scripted bounding-box annotation over a YOLO dataset directory.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset to annotate (a directory under the root)
    #[arg(short, long)]
    dataset: String,

    /// Directory holding the datasets (default: config value, then ".")
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Configuration file (default: the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Size of the view the image is letterboxed into, as WxH
    #[arg(long, value_parser = parse_size)]
    container: Option<ImageDimensions>,
}

fn parse_size(s: &str) -> Result<ImageDimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let dims = ImageDimensions::new(
        w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?,
        h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?,
    );
    if !dims.is_valid() {
        return Err(format!("size must be positive, got '{}'", s));
    }
    Ok(dims)
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Session = AnnotationSession<ThreadedExecutor>;

struct Driver {
    backend: Arc<YoloDirBackend>,
    session: Session,
    controller: InteractionController,
    container: Option<ImageDimensions>,
    last_pointer: ScreenPoint,
}

impl Driver {
    /// Run one script line. Returns false to stop.
    fn execute(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return true;
        };
        let args: Vec<&str> = parts.collect();

        match (command, args.as_slice()) {
            ("images", []) => match self.backend.list_images(self.session.dataset_id()) {
                Ok(images) => images.iter().for_each(|name| println!("{}", name)),
                Err(e) => eprintln!("error: {}", e),
            },
            ("classes", []) => {
                for category in self.session.classes() {
                    println!("{} {} {}", category.id, category.color().to_hex(), category.name);
                }
            }
            ("open", [image]) => self.open(image),
            ("down", [x, y]) => {
                if let Some(point) = parse_point(x, y) {
                    self.last_pointer = point;
                    self.controller.on_pointer_down(&mut self.session, point);
                }
            }
            ("move", [x, y]) => {
                if let Some(point) = parse_point(x, y) {
                    self.last_pointer = point;
                    self.controller.on_pointer_move(&self.session, point);
                }
            }
            ("up", rest) => {
                let point = match rest {
                    [x, y] => parse_point(x, y),
                    _ => Some(self.last_pointer),
                };
                if let Some(point) = point {
                    self.controller.on_pointer_up(&mut self.session, point);
                }
            }
            ("key", [combo]) => match KeyEvent::parse(combo) {
                Some(event) => {
                    let result =
                        self.controller
                            .on_key(&mut self.session, &event, false, Instant::now());
                    if result == KeyResult::ExitView {
                        println!("exit view");
                        return false;
                    }
                }
                None => eprintln!("error: unknown key '{}'", combo),
            },
            ("class", [id]) => match id.parse::<u32>() {
                Ok(id) if self.session.classes().iter().any(|c| c.id == id) => {
                    self.session.state_mut().set_current_class(id);
                }
                _ => eprintln!("error: no class '{}'", id),
            },
            ("clear", []) => {
                if self.session.state().draw_mode() == DrawMode::View {
                    eprintln!("error: cannot clear in view mode");
                } else {
                    self.controller.cancel_gesture();
                    if !self.session.state_mut().clear_boxes() {
                        println!("nothing to clear");
                    }
                }
            }
            ("tick", [ms]) => match ms.parse::<u64>() {
                Ok(ms) => std::thread::sleep(Duration::from_millis(ms)),
                Err(_) => eprintln!("error: invalid duration '{}'", ms),
            },
            ("list", []) => self.print_boxes(),
            ("status", []) => self.print_status(),
            ("quit", []) => return false,
            _ => eprintln!("error: cannot parse '{}'", line),
        }
        true
    }

    fn open(&mut self, image: &str) {
        self.controller.cancel_gesture();
        self.session.open_image(image, Instant::now());

        let started = Instant::now();
        while self.session.is_loading() && started.elapsed() < WAIT_TIMEOUT {
            std::thread::sleep(POLL_INTERVAL);
            self.session.tick(Instant::now());
        }

        let key = ImageKey::new(self.session.dataset_id(), image);
        let natural = self
            .backend
            .image_path(&key)
            .map_err(|e| e.to_string())
            .and_then(|path| image::image_dimensions(&path).map_err(|e| e.to_string()));

        match natural {
            Ok((width, height)) => {
                let natural = ImageDimensions::new(f64::from(width), f64::from(height));
                let layout = match self.container {
                    Some(container) => ImageLayout::fit(container, natural),
                    None => Some(ImageLayout::unscaled(natural)),
                };
                self.session.set_layout(layout);
                println!(
                    "opened {} ({}x{}, {} boxes)",
                    key,
                    width,
                    height,
                    self.session.state().len()
                );
            }
            Err(e) => {
                log::error!("Cannot read size of {}: {}", key, e);
                eprintln!("error: cannot read image {}: {}", key, e);
            }
        }
    }

    fn print_boxes(&self) {
        let state = self.session.state();
        for annotation in state.boxes() {
            let b = annotation.bbox;
            let marker = if state.selected_box_id() == Some(annotation.id) {
                "*"
            } else {
                " "
            };
            println!(
                "{}{} {} {:.6} {:.6} {:.6} {:.6}",
                marker, annotation.id, b.class_id, b.x, b.y, b.w, b.h
            );
        }
    }

    fn print_status(&self) {
        let state = self.session.state();
        let image = self
            .session
            .active_image()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "image={} mode={} class={} boxes={} dirty={} sync=\"{}\" undo={} redo={}",
            image,
            state.draw_mode().name(),
            state.current_class_id(),
            state.len(),
            state.is_dirty(),
            self.session.status(),
            state.undo_description().unwrap_or("-"),
            state.redo_description().unwrap_or("-"),
        );
    }

    fn report_notifications(&mut self) {
        for notification in self.session.take_notifications() {
            eprintln!("{}", notification);
        }
    }

    /// Close the image and wait for outstanding saves.
    fn finish(&mut self) {
        self.session.close(Instant::now());
        self.session.flush(Instant::now());

        let started = Instant::now();
        while self.session.has_pending_work() && started.elapsed() < WAIT_TIMEOUT {
            std::thread::sleep(POLL_INTERVAL);
            self.session.tick(Instant::now());
        }
        self.report_notifications();

        if self.session.has_pending_work() {
            log::warn!("Exiting with unsaved annotations");
            eprintln!("warning: some annotations could not be saved");
        }
    }
}

fn parse_point(x: &str, y: &str) -> Option<ScreenPoint> {
    match (x.parse::<f64>(), y.parse::<f64>()) {
        (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => Some(ScreenPoint::new(x, y)),
        _ => {
            eprintln!("error: invalid point '{} {}'", x, y);
            None
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path(),
    };

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let root = args
        .root
        .or_else(|| config.preferences.datasets_root.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    log::info!("Dataset '{}' under {:?}", args.dataset, root);

    let backend = Arc::new(YoloDirBackend::new(root));
    let executor = ThreadedExecutor::spawn(backend.clone())?;
    let session = AnnotationSession::new(args.dataset, executor, config.session_config()?);

    let mut driver = Driver {
        backend,
        session,
        controller: InteractionController::new(),
        container: args.container,
        last_pointer: ScreenPoint::default(),
    };

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let keep_going = driver.execute(line.trim());
        driver.session.tick(Instant::now());
        driver.report_notifications();
        if !keep_going {
            break;
        }
    }

    driver.finish();
    Ok(())
}

fn main() {
    if let Err(e) = run(Args::parse()) {
        eprintln!("boxmark: {}", e);
        std::process::exit(1);
    }
}
