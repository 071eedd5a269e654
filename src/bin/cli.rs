use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use rasterpal::utils::convert::{parse_hex_color, to_hex_color};
use rasterpal::{Image, OutputFormat, PixelFormat, Resolution, Size, image_handler};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Default JPEG quality (0-100) when writing .jpg files
    #[arg(long, global = true, env = "RASTERPAL_JPEG_QUALITY")]
    quality: Option<u8>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Bpp1,
    Bpp4,
    Bpp8,
    Gray16,
    Rgb24,
    Rgb32,
    Rgba32,
}

impl From<Format> for PixelFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Bpp1 => PixelFormat::Bpp1Indexed,
            Format::Bpp4 => PixelFormat::Bpp4Indexed,
            Format::Bpp8 => PixelFormat::Bpp8Indexed,
            Format::Gray16 => PixelFormat::Bpp16Gray,
            Format::Rgb24 => PixelFormat::Rgb24,
            Format::Rgb32 => PixelFormat::Rgb32,
            Format::Rgba32 => PixelFormat::Rgba32,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank image and save it
    New {
        #[arg(short, long)]
        width: u32,
        #[arg(short = 'H', long)]
        height: u32,
        #[arg(short, long, value_enum, default_value = "rgb24")]
        format: Format,
        #[arg(long, default_value_t = 96.0)]
        dpi: f32,
        /// Fill color, #RRGGBB or #RRGGBBAA
        #[arg(long)]
        fill: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Re-encode an image; the output extension picks the format
    Convert {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print size, resolution, and pixel format
    Info {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Key out one color (default: the bottom-left pixel)
    Transparent {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        color: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rasterpal=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New {
            width,
            height,
            format,
            dpi,
            fill,
            output,
        } => {
            let image = Image::create(
                Size::new(width, height),
                Resolution::new(dpi, dpi),
                format.into(),
            )?;
            if let Some(fill) = fill {
                image.create_canvas()?.clear(color_arg(&fill)?);
            }
            save(&image, &output, cli.quality)?;
            println!("Created {}x{} image at {}", width, height, output.display());
        }

        Commands::Convert { input, output } => {
            let image = image_handler::load_from_path(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            save(&image, &output, cli.quality)?;
            println!("Converted {} -> {}", input.display(), output.display());
        }

        Commands::Info { input } => {
            let image = image_handler::load_from_path(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let size = image.size()?;
            let resolution = image.resolution()?;
            println!("size:       {}x{}", size.width, size.height);
            println!("resolution: {}x{} dpi", resolution.horizontal, resolution.vertical);
            println!(
                "format:     {:?} (native {:?})",
                image.pixel_format()?,
                image.native_format()?
            );
            println!("top-left:   {}", to_hex_color(image.get_pixel((0, 0))?));
        }

        Commands::Transparent {
            input,
            output,
            color,
        } => {
            let mut image = image_handler::load_from_path(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let key = color.as_deref().map(color_arg).transpose()?;
            image.make_transparent(key)?;
            save(&image, &output, cli.quality)?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}

fn color_arg(s: &str) -> anyhow::Result<rasterpal::Color> {
    parse_hex_color(s).ok_or_else(|| anyhow!("Invalid color '{}', expected #RRGGBB or #RRGGBBAA", s))
}

fn save(image: &Image, output: &Path, quality: Option<u8>) -> anyhow::Result<()> {
    let format: OutputFormat = image_handler::output_format_for_path(output, quality)
        .ok_or_else(|| anyhow!("Cannot tell output format from {}", output.display()))?;
    image.save_to_path(output, format)?;
    Ok(())
}
