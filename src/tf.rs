//! Collaborators backed by frozen TensorFlow graphs.

use tensorflow::{ Tensor, Session, SessionOptions, Graph, SessionRunArgs, ImportGraphDefOptions };
use image::{ DynamicImage, GenericImageView, GrayImage, imageops::FilterType };
use imageproc::{ contrast, filter };
use log::debug;

use std::fs;
use std::path::Path;

use crate::error::LprError;
use crate::geometry::BBox;
use crate::pipeline::{ Detector, TextReader };
use crate::resolve::Fragment;
use crate::utils;

// output classes of the plate OCR graph, CTC blank is past the end
const CHARS: [&str; 83] = ["京", "沪", "津", "渝", "冀", "晋", "蒙", "辽", "吉", "黑", "苏", "浙", "皖", "闽", "赣", "鲁", "豫", "鄂", "湘", "粤", "桂",
             "琼", "川", "贵", "云", "藏", "陕", "甘", "青", "宁", "新", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "A",
             "B", "C", "D", "E", "F", "G", "H", "J", "K", "L", "M", "N", "P", "Q", "R", "S", "T", "U", "V", "W", "X",
             "Y", "Z","港","学","使","警","澳","挂","军","北","南","广","沈","兰","成","济","海","民","航","空"
             ];
const OCR_SHAPE: [usize; 2] = [18, 84];
const OCR_WIDTH: u32 = 48;
const OCR_HEIGHT: u32 = 164;

fn load_session(pb_file: &Path) -> Result<(Graph, Session), LprError> {
    let pb = fs::read(pb_file)?;
    let mut graph = Graph::new();
    graph.import_graph_def(&pb, &ImportGraphDefOptions::new())?;
    let session = Session::new(&SessionOptions::new(), &graph)?;
    Ok((graph, session))
}

/// SSD-style plate detector: `image_tensor` in, normalized boxes and scores out.
pub struct TfDetector {
    graph: Graph,
    session: Session,
    score_needed: f32,
}

impl TfDetector {

    pub fn new(pb_file: impl AsRef<Path>, score_needed: f32) -> Result<Self, LprError> {
        let (graph, session) = load_session(pb_file.as_ref())?;
        Ok(Self { graph, session, score_needed })
    }

    fn run(&self, input: &Tensor<u8>) -> Result<(Tensor<f32>, Tensor<f32>), LprError> {
        let graph = &self.graph;
        let mut args = SessionRunArgs::new();
        args.add_feed(&graph.operation_by_name_required("image_tensor")?, 0, input);
        let box_token = args.request_fetch(&graph.operation_by_name_required("detection_boxes")?, 0);
        let scores_token = args.request_fetch(&graph.operation_by_name_required("detection_scores")?, 0);
        self.session.run(&mut args)?;
        let boxes: Tensor<f32> = args.fetch(box_token)?;
        let scores: Tensor<f32> = args.fetch(scores_token)?;
        Ok((boxes, scores))
    }
}

impl Detector for TfDetector {
    fn name(&self) -> &'static str {
        "tensorflow-ssd"
    }

    fn detect(&self, img: &DynamicImage) -> Result<Vec<BBox>, LprError> {
        let (width, height) = img.dimensions();
        let img_data = img.to_rgb8().into_raw();
        let img_tensor = Tensor::new(&[1, height as u64, width as u64, 3]).with_values(&img_data)?;

        // box is ymin xmin ymax xmax, normalized to 1
        let (boxes, scores) = self.run(&img_tensor)?;
        let proposals: Vec<BBox> = boxes.chunks(4).zip(scores.iter())
            .filter(|(_, score)| **score > self.score_needed)
            .map(|(v, score)| BBox::new(
                v[1] * width as f32,
                v[0] * height as f32,
                v[3] * width as f32,
                v[2] * height as f32,
                *score,
                0,
            ))
            .collect();
        debug!("{} boxes above score {}", proposals.len(), self.score_needed);
        Ok(proposals)
    }
}

/// CTC plate recognizer. Reads the whole crop as a single fragment.
pub struct TfTextReader {
    graph: Graph,
    session: Session,
}

impl TfTextReader {

    pub fn new(pb_file: impl AsRef<Path>) -> Result<Self, LprError> {
        let (graph, session) = load_session(pb_file.as_ref())?;
        Ok(Self { graph, session })
    }

    fn run(&self, input: &Tensor<f32>) -> Result<Tensor<f32>, LprError> {
        let graph = &self.graph;
        let mut args = SessionRunArgs::new();
        args.add_feed(&graph.operation_by_name_required("input_1")?, 0, input);
        let res = args.request_fetch(&graph.operation_by_name_required("dense_2/truediv")?, 0);
        self.session.run(&mut args)?;
        Ok(args.fetch(res)?)
    }
}

impl TextReader for TfTextReader {
    fn name(&self) -> &'static str {
        "tensorflow-ctc"
    }

    fn read(&self, plate: &GrayImage) -> Result<Vec<Fragment>, LprError> {
        let (width, height) = plate.dimensions();
        let img = utils::equalize_hist_in_gray(&DynamicImage::ImageLuma8(plate.clone()));
        // the graph reads columns as time steps
        let img = utils::transpose(&img);
        let img = img.resize_exact(OCR_WIDTH, OCR_HEIGHT, FilterType::Nearest).to_luma8();
        let mut img = filter::gaussian_blur_f32(&img, 1.4);
        contrast::equalize_histogram_mut(&mut img);
        let input: Vec<f32> = DynamicImage::ImageLuma8(img).to_rgb8().into_raw()
            .into_iter()
            .map(|v| v as f32)
            .collect();
        let tensor = Tensor::new(&[1, OCR_HEIGHT as u64, OCR_WIDTH as u64, 3]).with_values(&input)?;

        let output = self.run(&tensor)?;
        let (text, confidence) = ctc_greedy_decode(&output, OCR_SHAPE);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let (w, h) = (width as f32, height as f32);
        Ok(vec![Fragment::new(text, vec![(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)], confidence)])
    }
}

fn ctc_greedy_decode(probs: &[f32], shape: [usize; 2]) -> (String, f32) {
    let argmax = utils::argmax_in_axis0(probs, &shape);
    let mut text = String::new();
    let mut total = 0.0;
    let mut count = 0;
    for (step, class) in argmax.iter().enumerate() {
        if *class >= CHARS.len() || (step > 0 && argmax[step - 1] == *class) {
            continue;
        }
        text.push_str(CHARS[*class]);
        total += probs[step * shape[1] + class];
        count += 1;
    }
    let confidence = if count == 0 { 0.0 } else { total / count as f32 };
    (text, confidence)
}

#[cfg(test)]
mod test {

    use super::{ ctc_greedy_decode, CHARS };

    #[test]
    fn decode_collapses_repeats_and_blanks() {
        let classes = CHARS.len() + 1;
        let blank = CHARS.len();
        // "A", "A", blank, "A", "7"
        let steps = [41, 41, blank, 41, 38];
        let mut probs = vec![0.0; steps.len() * classes];
        for (t, c) in steps.iter().enumerate() {
            probs[t * classes + c] = 0.8;
        }
        let (text, confidence) = ctc_greedy_decode(&probs, [steps.len(), classes]);
        assert_eq!(text, "AA7");
        assert!((confidence - 0.8).abs() < 1e-6);
    }
}
