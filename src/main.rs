use clap::{ App, Arg, ArgMatches, SubCommand };
use log::info;

use std::error::Error;
use std::path::Path;

use plate_resolver::{ Detector, Pipeline, PlateReading, Recording, Settings, TextReader };


fn main() -> Result<(), Box<dyn Error>>{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let recognize = SubCommand::with_name("recognize")
                    .about("Runs the TensorFlow models on an image")
                    .arg(Arg::with_name("IMAGE")
                        .help("image file with license plate")
                        .required(true)
                        .index(1))
                    .arg(Arg::with_name("detect-model")
                        .long("detect-model")
                        .takes_value(true)
                        .default_value("./models/detect.pb"))
                    .arg(Arg::with_name("ocr-model")
                        .long("ocr-model")
                        .takes_value(true)
                        .default_value("./models/ocr_plate_all_gru.pb"))
                    .arg(Arg::with_name("score")
                        .long("score")
                        .help("minimum detector score")
                        .takes_value(true)
                        .default_value("0.6"));
    let matches = App::new("plate-resolver")
                    .version(env!("CARGO_PKG_VERSION"))
                    .about("Turns plate detections and OCR fragments into canonical plate text")
                    .arg(Arg::with_name("config")
                        .long("config")
                        .short("c")
                        .takes_value(true)
                        .global(true)
                        .help("TOML settings file"))
                    .arg(Arg::with_name("json")
                        .long("json")
                        .global(true)
                        .help("print readings as JSON"))
                    .subcommand(SubCommand::with_name("replay")
                        .about("Runs the pipeline over recorded detector and OCR output")
                        .arg(Arg::with_name("RECORDING")
                            .help("JSON recording")
                            .required(true)
                            .index(1)))
                    .subcommand(recognize)
                    .get_matches();

    let settings = Settings::load(matches.value_of("config").map(Path::new))?;
    let json = matches.is_present("json");

    match matches.subcommand() {
        ("replay", Some(sub)) => {
            let path = sub.value_of("RECORDING").ok_or("recording is required")?;
            let recording = Recording::from_path(path)?;
            let img = recording.blank_image();
            let (detector, reader) = recording.into_collaborators();
            let readings = run(&settings, detector, reader, &img)?;
            print_readings(&readings, json)?;
        }
        ("recognize", Some(sub)) => recognize_image(&settings, sub, json)?,
        _ => return Err(matches.usage().into()),
    }
    Ok(())
}

fn run<D: Detector, R: TextReader>(settings: &Settings, detector: D, reader: R, img: &image::DynamicImage) -> Result<Vec<PlateReading>, Box<dyn Error>> {
    let pipeline = Pipeline::with_parts(detector, reader, settings.deduplicator()?, settings.resolver()?);
    let readings = pipeline.recognize(img)?;
    info!("{} plate(s), {} with text", readings.len(), readings.iter().filter(|r| r.is_detected()).count());
    Ok(readings)
}

#[cfg(feature = "tensorflow-backend")]
fn recognize_image(settings: &Settings, sub: &ArgMatches, json: bool) -> Result<(), Box<dyn Error>> {
    use plate_resolver::tf::{ TfDetector, TfTextReader };

    let file_name = sub.value_of("IMAGE").ok_or("image is required")?;
    let score: f32 = sub.value_of("score").unwrap_or("0.6").parse()?;
    let img = image::open(file_name)?;
    let detector = TfDetector::new(sub.value_of("detect-model").ok_or("detect model is required")?, score)?;
    let reader = TfTextReader::new(sub.value_of("ocr-model").ok_or("ocr model is required")?)?;
    let readings = run(settings, detector, reader, &img)?;
    print_readings(&readings, json)
}

#[cfg(not(feature = "tensorflow-backend"))]
fn recognize_image(_settings: &Settings, _sub: &ArgMatches, _json: bool) -> Result<(), Box<dyn Error>> {
    Err("built without the tensorflow-backend feature".into())
}

fn print_readings(readings: &[PlateReading], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(readings)?);
        return Ok(());
    }
    for reading in readings {
        let b = &reading.bbox;
        println!("{},{},{},{} conf={:.3} -> {}", b.x1, b.y1, b.x2, b.y2, b.confidence, reading.text);
    }
    Ok(())
}
