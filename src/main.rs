use std::sync::Arc;

use dicom_mpr::{
    DicomFileSource, MprConfig, MprService, NearestNeighborResampler, StandardPlane,
    image_id::CENTER, service::standard_orientation,
};
use log::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let source = Arc::new(
        DicomFileSource::open_directory("dicom").expect("should have loaded files from directory"),
    );
    let service = MprService::new(
        MprConfig::default(),
        source.clone(),
        source.clone(),
        Arc::new(NearestNeighborResampler),
    );
    service.register_series("dicom", source.slice_ids());

    for plane in StandardPlane::all() {
        let result = service
            .reslice("dicom", &standard_orientation(plane), CENTER)
            .await
            .expect("should have resliced volume at its center");
        let path = format!("{plane}.png");
        result
            .to_luma_image()
            .expect("should have converted reslice to an image")
            .save(&path)
            .expect("should have written image");
        info!("wrote {} x {} {plane} image to {path}", result.columns(), result.rows());
    }
}
