use argh::FromArgs;
use image::{DynamicImage, ImageFormat};
use log::debug;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

/// bfg command-line encoder, decoder, and benchmark harness.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
    Bench(Bench),
    Evaluate(Evaluate),
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Png,
    Jpg,
    Bmp,
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("jpg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
        else { return Err("invalid format, expected png, jpg, or bmp"); };

        Ok(format)
    }
}

impl From<Format> for ImageFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Png => ImageFormat::Png,
            Format::Jpg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
        Command::Bench(options) => bench(options),
        Command::Evaluate(options) => evaluate(options),
    }
}

fn open_image(input: &str, format: Option<Format>) -> Result<DynamicImage, Box<dyn std::error::Error>> {
    let image = match format {
        Some(format) => image::io::Reader::with_format(
            BufReader::new(std::fs::File::open(input)?),
            format.into(),
        )
        .decode()?,
        None => {
            debug!("no format given for `{input}`, guessing from content");
            image::io::Reader::open(input)?
                .with_guessed_format()?
                .decode()?
        }
    };
    Ok(image)
}

/// Encodes a PNG, JPG, or BMP image as BFG.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// input format, optional (png, jpg, bmp); guessed from content if omitted
    #[argh(option)]
    format: Option<Format>,
    /// the input image
    #[argh(positional)]
    input: String,
    /// the output `.bfg` file
    #[argh(positional)]
    output: String,
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        format,
        input,
        output,
    } = options;

    let image = open_image(&input, format)?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.into_raw();

    println!("Encoding {width}x{height} image");
    let header = bfg::container::write(&output, width, height, 3, &pixels)?;
    println!("Written {} bytes to `{output}`", header.n_bytes);

    Ok(())
}

/// Decodes a BFG file back into a PNG, JPG, or BMP image.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format (png, jpg, bmp)
    #[argh(option)]
    format: Format,
    /// the input `.bfg` file
    #[argh(positional)]
    input: String,
    /// the output image
    #[argh(positional)]
    output: String,
}

fn decode(options: Decode) -> Result<(), Box<dyn std::error::Error>> {
    let Decode {
        format,
        input,
        output,
    } = options;

    println!("Decoding `{input}`");
    let (header, pixels) = bfg::container::read(&input)?;

    if header.n_channels != 3 {
        return Err(format!(
            "cannot write a {}-channel BFG image as {format:?}; only 3-channel RGB is supported",
            header.n_channels
        )
        .into());
    }

    image::RgbImage::from_vec(header.width, header.height, pixels)
        .ok_or("decoded pixel buffer did not match header dimensions")?
        .save_with_format(&output, format.into())?;

    println!(
        "Written {}x{} image to `{output}`",
        header.width, header.height
    );

    Ok(())
}

/// Benchmarks a single image: PNG decode, BFG encode, BFG decode, PNG
/// re-encode, and the resulting compression ratio against raw bytes.
#[derive(FromArgs)]
#[argh(subcommand, name = "bench")]
struct Bench {
    /// the input PNG file
    #[argh(positional)]
    input: String,
}

fn bench(options: Bench) -> Result<(), Box<dyn std::error::Error>> {
    let Bench { input } = options;

    let begin = Instant::now();
    let image = open_image(&input, Some(Format::Png))?;
    let png_decode_millis = begin.elapsed().as_secs_f64() * 1000.0;

    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.into_raw();
    let raw_bytes = pixels.len();

    let begin = Instant::now();
    let (header, payload) = bfg::encode_image(width, height, 3, &pixels)?;
    let bfg_encode_millis = begin.elapsed().as_secs_f64() * 1000.0;

    let begin = Instant::now();
    let decoded = bfg::decode_image(&header, &payload)?;
    let bfg_decode_millis = begin.elapsed().as_secs_f64() * 1000.0;

    assert_eq!(decoded, pixels, "bfg round-trip produced different pixels");

    println!("millis (png decode): {png_decode_millis:.4}");
    println!("millis (bfg encode): {bfg_encode_millis:.4}");
    println!("millis (bfg decode): {bfg_decode_millis:.4}");
    println!("raw bytes: {raw_bytes}");
    println!(
        "bfg bytes: {} ({}%)",
        header.n_bytes,
        100 * header.n_bytes as usize / raw_bytes
    );

    Ok(())
}

/// Compares BFG against PNG across many images and prints a summary table.
#[derive(FromArgs)]
#[argh(subcommand, name = "evaluate")]
struct Evaluate {
    /// the input PNG files
    #[argh(positional)]
    inputs: Vec<PathBuf>,
}

struct Stats {
    name: String,
    raw_bytes: usize,
    png_bytes: usize,
    bfg_bytes: usize,
    bfg_enc_millis: f64,
    bfg_dec_millis: f64,
}

fn evaluate(options: Evaluate) -> Result<(), Box<dyn std::error::Error>> {
    let Evaluate { inputs } = options;
    let mut stats = Vec::with_capacity(inputs.len());

    for path in &inputs {
        let png_bytes = std::fs::metadata(path)?.len() as usize;
        let image = open_image(&path.to_string_lossy(), Some(Format::Png))?;
        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.into_raw();

        let begin = Instant::now();
        let (header, payload) = bfg::encode_image(width, height, 3, &pixels)?;
        let bfg_enc_millis = begin.elapsed().as_secs_f64() * 1000.0;

        let begin = Instant::now();
        let _ = bfg::decode_image(&header, &payload)?;
        let bfg_dec_millis = begin.elapsed().as_secs_f64() * 1000.0;

        stats.push(Stats {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            raw_bytes: pixels.len(),
            png_bytes,
            bfg_bytes: header.n_bytes as usize,
            bfg_enc_millis,
            bfg_dec_millis,
        });
    }

    println!("image filename\tpng ratio\tbfg ratio\tenc ms\tdec ms");
    println!("--------------\t---------\t---------\t------\t------");
    for s in &stats {
        let png_ratio = 100 * s.png_bytes / s.raw_bytes;
        let bfg_ratio = 100 * s.bfg_bytes / s.raw_bytes;
        println!(
            "{}\t{png_ratio}%\t{bfg_ratio}%\t{:.4}\t{:.4}",
            s.name, s.bfg_enc_millis, s.bfg_dec_millis
        );
    }

    Ok(())
}
