use std::sync::{Arc, RwLock};

use crate::application::ports::DetectorPort;
use crate::domain::model::ModelName;

/// Modelo activo junto con su nombre.
#[derive(Clone)]
pub struct ActiveModel {
    pub name: ModelName,
    pub detector: Arc<dyn DetectorPort>,
}

/// Celda compartida con el modelo "actual".
/// Los lectores clonan el `Arc` y sueltan el lock antes de inferir, así que un cambio
/// nunca espera a una inferencia en curso ni la interrumpe.
pub struct ModelSlot {
    current: RwLock<Arc<ActiveModel>>,
}

impl ModelSlot {
    pub fn new(initial: ActiveModel) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    pub fn get(&self) -> Arc<ActiveModel> {
        // Un lock envenenado sigue conteniendo un Arc completo: el swap es una sola asignación.
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, next: ActiveModel) {
        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{detection::Detection, errors::DomainResult};
    use image::RgbImage;

    struct Fixed(&'static str);

    impl DetectorPort for Fixed {
        fn infer(&self, _image: &RgbImage) -> DomainResult<Vec<Detection>> {
            Ok(vec![Detection::new(self.0, 0.5, [0, 0, 1, 1])])
        }
    }

    fn active(name: &str, label: &'static str) -> ActiveModel {
        ActiveModel { name: ModelName::parse(name).unwrap(), detector: Arc::new(Fixed(label)) }
    }

    #[test]
    fn readers_keep_the_snapshot_they_took() {
        let slot = ModelSlot::new(active("yolov8n", "nano"));
        let before = slot.get();

        slot.set(active("yolov8s", "small"));
        let after = slot.get();

        let img = RgbImage::new(2, 2);
        assert_eq!(before.name.as_str(), "yolov8n");
        assert_eq!(before.detector.infer(&img).unwrap()[0].label, "nano");
        assert_eq!(after.name.as_str(), "yolov8s");
        assert_eq!(after.detector.infer(&img).unwrap()[0].label, "small");
    }

    #[test]
    fn concurrent_readers_never_see_a_torn_pair() {
        let slot = Arc::new(ModelSlot::new(active("yolov8n", "yolov8n")));
        let img = RgbImage::new(1, 1);

        let writer = {
            let slot = slot.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    let (name, label) = if i % 2 == 0 { ("yolov8s", "yolov8s") } else { ("yolov8n", "yolov8n") };
                    slot.set(active(name, label));
                }
            })
        };

        for _ in 0..500 {
            let model = slot.get();
            let label = model.detector.infer(&img).unwrap().remove(0).label;
            assert_eq!(label, model.name.as_str());
        }
        writer.join().unwrap();
    }
}
