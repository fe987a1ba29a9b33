use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::application::ports::DetectorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::YoloParams;

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Motor YOLOv8 sobre ONNX Runtime.
/// `Session::run` necesita acceso exclusivo, por eso las inferencias sobre el mismo
/// motor se serializan; motores distintos corren en paralelo.
pub struct OnnxYoloEngine {
    session: Mutex<Session>,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(path: &Path, params: YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;

        Ok(Self { session: Mutex::new(session), params })
    }

    fn run(&self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Tensor::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("sesión ONNX envenenada por un pánico previo"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view
            .index_axis(Axis(0), 0)
            .into_dimensionality::<ndarray::Ix2>()?;

        decode_predictions(view, rgb.width(), rgb.height(), &self.params)
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn infer(&self, image: &RgbImage) -> DomainResult<Vec<Detection>> {
        self.run(image).map_err(|e| DomainError::Inference(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: usize,
}

/// Decodifica la salida YOLOv8 `[4 + clases, candidatos]` (cx, cy, w, h en píxeles de
/// entrada) a detecciones en coordenadas de la imagen original.
fn decode_predictions(
    view: ArrayView2<'_, f32>,
    orig_w: u32,
    orig_h: u32,
    params: &YoloParams,
) -> Result<Vec<Detection>> {
    if view.shape()[0] <= 4 {
        return Err(anyhow!(
            "salida inesperada del modelo: {:?}, se esperaban 4 + clases filas",
            view.shape()
        ));
    }

    let imgsz = params.input_size as f32;
    let sx = orig_w as f32 / imgsz;
    let sy = orig_h as f32 / imgsz;

    let mut candidates = Vec::new();
    for i in 0..view.shape()[1] {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if score > params.conf_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            candidates.push(Candidate {
                x1: ((cx - w / 2.0) * sx).clamp(0.0, orig_w as f32),
                y1: ((cy - h / 2.0) * sy).clamp(0.0, orig_h as f32),
                x2: ((cx + w / 2.0) * sx).clamp(0.0, orig_w as f32),
                y2: ((cy + h / 2.0) * sy).clamp(0.0, orig_h as f32),
                score,
                class_id,
            });
        }
    }

    Ok(non_max_suppression(candidates, params.iou_threshold)
        .into_iter()
        .take(params.max_detections)
        .map(|c| {
            let label = COCO_CLASSES.get(c.class_id).copied().unwrap_or("object");
            Detection::new(label, c.score, [c.x1 as i32, c.y1 as i32, c.x2 as i32, c.y2 as i32])
        })
        .collect())
}

/// NMS por clase; devuelve los supervivientes ordenados por confianza descendente.
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    let mut suppressed = vec![false; candidates.len()];
    let mut keep = Vec::new();
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i]);
        for j in (i + 1)..candidates.len() {
            if !suppressed[j]
                && candidates[j].class_id == candidates[i].class_id
                && iou(&candidates[i], &candidates[j]) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let iw = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let ih = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = iw * ih;
    let union = (a.x2 - a.x1) * (a.y2 - a.y1) + (b.x2 - b.x1) * (b.y2 - b.y1) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}
