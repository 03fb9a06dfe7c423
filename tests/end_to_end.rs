mod common;

use brrtfetch::engine::source::{DecodedGif, Disposal};
use brrtfetch::renderer::pipeline::Pipeline;
use brrtfetch::types::RenderConfig;

use common::{BLUE, RED, Square, glyph, write_gif};

fn color_config(width: u16, height: u16) -> RenderConfig {
    RenderConfig {
        width,
        height,
        color: true,
        ..RenderConfig::default()
    }
}

#[test]
fn blue_then_red_square_has_no_blue_left_over() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("squares.gif");
    write_gif(
        &path,
        4,
        &[
            Square {
                left: 0,
                top: 0,
                width: 4,
                height: 4,
                color: BLUE,
                dispose: gif::DisposalMethod::Any,
            },
            Square {
                left: 0,
                top: 0,
                width: 4,
                height: 4,
                color: RED,
                dispose: gif::DisposalMethod::Background,
            },
        ],
    );

    let gif = DecodedGif::open(&path)?;
    assert_eq!(gif.frames[0].disposal, Disposal::None);
    assert_eq!(gif.frames[1].disposal, Disposal::RestoreBackground);

    let frames = Pipeline::new(2).render(&gif, &color_config(2, 1));
    assert_eq!(frames.len(), 2);

    let blue = glyph(BLUE, BLUE).repeat(2);
    let red = glyph(RED, RED).repeat(2);
    assert_eq!(String::from_utf8(frames[0].0.clone())?, blue);
    assert_eq!(String::from_utf8(frames[1].0.clone())?, red);
    assert!(!String::from_utf8(frames[1].0.clone())?.contains("0;0;255"));
    Ok(())
}

#[test]
fn background_disposal_exposes_transparency_not_old_pixels() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("half.gif");
    write_gif(
        &path,
        4,
        &[
            Square {
                left: 0,
                top: 0,
                width: 4,
                height: 4,
                color: BLUE,
                dispose: gif::DisposalMethod::Background,
            },
            Square {
                left: 0,
                top: 0,
                width: 2,
                height: 4,
                color: RED,
                dispose: gif::DisposalMethod::Any,
            },
        ],
    );

    let gif = DecodedGif::open(&path)?;
    let frames = Pipeline::new(3).render(&gif, &color_config(2, 1));

    let expected = format!("{}\x1b[0m ", glyph(RED, RED));
    assert_eq!(String::from_utf8(frames[1].0.clone())?, expected);
    Ok(())
}

#[test]
fn missing_gif_renders_zero_frames() {
    let gif = DecodedGif::load_or_empty(std::path::Path::new("/definitely/not/here.gif"));
    let frames = Pipeline::default().render(&gif, &color_config(10, 5));
    assert!(frames.is_empty());
}

#[test]
fn dithered_render_is_stable_across_worker_counts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dither.gif");
    write_gif(
        &path,
        8,
        &[Square {
            left: 0,
            top: 0,
            width: 8,
            height: 8,
            color: [90, 140, 30],
            dispose: gif::DisposalMethod::Keep,
        }],
    );

    let gif = DecodedGif::open(&path)?;
    let config = RenderConfig {
        dither: 0.5,
        ..color_config(4, 2)
    };
    assert_eq!(
        Pipeline::new(1).render(&gif, &config),
        Pipeline::new(6).render(&gif, &config)
    );
    Ok(())
}
