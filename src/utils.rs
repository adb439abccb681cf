use image::{ DynamicImage, GenericImage, GenericImageView, GrayImage };
use imageproc::contrast;
use imageproc::rect::Rect;

use crate::geometry::BBox;

/// Pixel rectangle of a box, truncated to whole pixels and clamped to the image.
/// `None` when nothing of the box lies inside the image.
pub fn region_in_image(a_box: &BBox, (width, height): (u32, u32)) -> Option<Rect> {
    let clamp = |v: f32, max: u32| -> u32 {
        if v.is_nan() || v <= 0.0 {
            0
        } else {
            (v as u32).min(max)
        }
    };
    let x1 = clamp(a_box.x1, width);
    let y1 = clamp(a_box.y1, height);
    let x2 = clamp(a_box.x2, width);
    let y2 = clamp(a_box.y2, height);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::at(x1 as i32, y1 as i32).of_size(x2 - x1, y2 - y1))
}

/// Crops the box out of the image as 8-bit gray, the form text readers get.
pub fn crop_gray(img: &DynamicImage, a_box: &BBox) -> Option<GrayImage> {
    let rect = region_in_image(a_box, img.dimensions())?;
    let plate = img.crop_imm(rect.left() as u32, rect.top() as u32, rect.width(), rect.height());
    Some(plate.to_luma8())
}

// tensor output is laid out row by row, one row per time step
pub fn argmax_in_axis0(input: &[f32], shape: &[usize]) -> Vec<usize> {
    input.chunks(shape[1]).map(|v: &[f32]| {
        let mut max = f32::NEG_INFINITY;
        let mut index = 0;
        v.iter().enumerate().for_each(|(i, v_in_v)| {
            if *v_in_v >= max {
                max = *v_in_v;
                index = i;
            }
        });
        index
    }).collect()
}

pub fn transpose(input: &DynamicImage) -> DynamicImage {
    let img = input.to_rgba8();
    let mut output = DynamicImage::new_rgba8(img.height(), img.width());
    img.rows().enumerate().for_each(|(y, pixels)| {
        pixels.enumerate().for_each(|(x, pixel)| {
            output.put_pixel(y as u32, x as u32, *pixel);
        });
    });
    output
}

pub fn equalize_hist_in_gray(img: &DynamicImage) -> DynamicImage {
    let gray = img.to_luma8();
    DynamicImage::ImageLuma8(contrast::equalize_histogram(&gray))
}
