//! Packet map builder for face detector requests

use vision_tasks_core::{
    ImageFrame, Packet, PacketMap, Rect, RegionNormalizer, Result, Timestamp,
};

use crate::streams::{IMAGE_IN_STREAM, NORM_RECT_IN_STREAM};

/// The face detector always processes the whole image
pub const ROI_ALLOWED: bool = false;

/// Marshal one request into the graph's input packet map
///
/// Both packets carry `timestamp` when one is given and are unstamped
/// otherwise (image mode).
///
/// # Errors
///
/// * `Error::InvalidArgument` - the region could not be normalized (explicit
///   ROI, mirrored orientation, zero-sized image)
pub fn build_input_packets(
    image: &ImageFrame,
    roi: Option<Rect>,
    timestamp: Option<Timestamp>,
    normalizer: &dyn RegionNormalizer,
) -> Result<PacketMap> {
    let rect = normalizer.normalize(roi, image.size(), image.orientation(), ROI_ALLOWED)?;

    let mut packets = PacketMap::with_capacity(2);
    packets.insert(
        IMAGE_IN_STREAM.to_string(),
        Packet::image(image.clone()).at_optional(timestamp),
    );
    packets.insert(
        NORM_RECT_IN_STREAM.to_string(),
        Packet::normalized_rect(rect).at_optional(timestamp),
    );
    Ok(packets)
}
