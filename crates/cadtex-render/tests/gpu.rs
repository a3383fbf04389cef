//! End-to-end atlas rendering. Tests that need a GPU adapter are ignored by
//! default; run with `--ignored` on a machine that has one.

use std::f64::consts::TAU;

use approx::assert_relative_eq;
use cadtex_codec::builder::{
    build_bodies, build_trim_sets, curve_dims, CurveLibraryBuilder, SurfaceLibraryBuilder, SurfaceParams,
};
use cadtex_codec::{BodyDescriptor, BodyItemRef, FormatCodec, SurfaceDims, TrimCurveRef, TrimSet};
use cadtex_core::{CurveId, FormatVersion, SurfaceId, TrimSetId};
use cadtex_geometry::curve::Line;
use cadtex_geometry::{CurveData, CurveFlags, CurveGeometry, CurveRefFlags, SurfaceFlags};
use cadtex_layout::{run_layout, LayoutRequest, LibraryBuffers};
use cadtex_math::{Box2, Box3, DVec2, Point2, Point3, Vector2, Xfo, Xfo2};
use cadtex_render::atlas::TRIM_MASK_FORMAT;
use cadtex_render::{read_texture, AtlasRenderer, AtlasTexture, Contents, GpuContext, GpuLibraries};

fn dims(size: (f32, f32), curvature_u: f32) -> SurfaceDims {
    SurfaceDims {
        curvature_u,
        curvature_v: 0.0,
        size_u: size.0,
        size_v: size.1,
        flags: SurfaceFlags::empty(),
        trim_set: None,
    }
}

/// A unit plane and a radius-5 cylinder of height 10.
fn asset() -> LibraryBuffers {
    let codec = FormatCodec::default();
    let (curve_toc, curve_texture) = CurveLibraryBuilder::new(codec).build();

    let mut surfaces = SurfaceLibraryBuilder::new(codec);
    surfaces.push_surface(dims((1.0, 1.0), 0.0), Box2::UNIT, &SurfaceParams::Plane);
    surfaces.push_surface(
        dims((31.4, 10.0), TAU as f32),
        Box2::new(DVec2::ZERO, DVec2::new(TAU, 10.0)),
        &SurfaceParams::Cylinder { radius: 5.0 },
    );
    let (surface_toc, surface_texture) = surfaces.build();

    let item = |id| BodyItemRef {
        id,
        xfo: Xfo::IDENTITY,
        color: None,
    };
    let (body_toc, body_texture) = build_bodies(
        &codec,
        &[BodyDescriptor {
            bbox: Box3::new(Point3::splat(-5.0), Point3::splat(10.0)),
            surfaces: vec![item(0), item(1)],
            curves: Vec::new(),
        }],
    );

    LibraryBuffers {
        curve_toc,
        curve_texture,
        surface_toc,
        surface_texture,
        trim_sets: build_trim_sets(&codec, 0.0, &[]),
        body_toc,
        body_texture,
    }
}

fn texel(data: &[f32], width: u32, x: u32, y: u32) -> [f32; 4] {
    let i = ((y * width + x) * 4) as usize;
    [data[i], data[i + 1], data[i + 2], data[i + 3]]
}

#[test]
#[ignore = "requires GPU"]
fn test_surface_positions_match_cpu_corners() {
    let ctx = GpuContext::init_blocking().expect("gpu context");
    let mut request = LayoutRequest::new(asset(), FormatVersion::latest());
    request.bounding_radius = 10.0;
    request.generation = 1;
    let result = run_layout(request).expect("layout");

    let libs = GpuLibraries::upload(&ctx, &result.buffers).expect("upload");
    let mut renderer = AtlasRenderer::new(&ctx).expect("renderer");
    assert!(renderer.render(&ctx, &libs, &result.plan, result.generation).unwrap());
    // same generation and size: nothing to do
    assert!(!renderer.render(&ctx, &libs, &result.plan, result.generation).unwrap());

    let atlas = &renderer.atlases().surface_positions;
    let bytes = read_texture(&ctx, &atlas.texture, 16).expect("readback");
    let data: &[f32] = bytemuck::cast_slice(&bytes);
    let width = atlas.width();

    let expected = [
        (SurfaceId(0), [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
        (SurfaceId(1), [5.0, 0.0, 0.0], [5.0, 0.0, 10.0]),
    ];
    for (id, first, last) in expected {
        let rect = result.plan.surface_atlas.rect(id.0 as usize).expect("laid out");
        let (x, y) = (rect[0] as u32, rect[1] as u32);
        let (x1, y1) = (x + rect[2] as u32 - 1, y + rect[3] as u32 - 1);

        let p = texel(data, width, x, y);
        assert_eq!(p[3], 1.0, "{id:?} origin is valid");
        for k in 0..3 {
            assert_relative_eq!(p[k], first[k], epsilon = 1e-3);
        }
        let q = texel(data, width, x1, y1);
        for k in 0..3 {
            assert_relative_eq!(q[k], last[k], epsilon = 1e-3);
        }
    }
}

#[test]
#[ignore = "requires GPU"]
fn test_invalidate_forces_a_rerender() {
    let ctx = GpuContext::init_blocking().expect("gpu context");
    let result = run_layout(LayoutRequest::new(asset(), FormatVersion::latest())).expect("layout");
    let libs = GpuLibraries::upload(&ctx, &result.buffers).expect("upload");
    let mut renderer = AtlasRenderer::new(&ctx).expect("renderer");

    assert!(renderer.render(&ctx, &libs, &result.plan, 3).unwrap());
    renderer.invalidate();
    assert!(renderer.render(&ctx, &libs, &result.plan, 3).unwrap());
    assert!(renderer.render(&ctx, &libs, &result.plan, 4).unwrap());
}

fn write_bytes(ctx: &GpuContext, atlas: &AtlasTexture, bytes: &[u8]) {
    let (width, height) = atlas.size();
    ctx.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &atlas.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytes,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

#[test]
#[ignore = "requires GPU"]
fn test_growth_preserves_or_discards_contents() {
    let ctx = GpuContext::init_blocking().expect("gpu context");
    let mut atlas = AtlasTexture::new(&ctx, "growth", TRIM_MASK_FORMAT, 4, 4).expect("atlas");
    let old: Vec<u8> = (1..=16).collect();
    write_bytes(&ctx, &atlas, &old);

    assert!(atlas.ensure_size(&ctx, 8, 4, Contents::Preserve).unwrap());
    assert_eq!(atlas.size(), (8, 4));
    let data = read_texture(&ctx, &atlas.texture, 1).expect("readback");
    for y in 0..4 {
        let row = &data[y * 8..y * 8 + 8];
        assert_eq!(&row[..4], &old[y * 4..y * 4 + 4], "row {y}");
        assert_eq!(&row[4..], &[0; 4], "row {y}");
    }

    // already big enough: no re-allocation either way
    assert!(!atlas.ensure_size(&ctx, 8, 2, Contents::Discard).unwrap());

    assert!(atlas.ensure_size(&ctx, 8, 8, Contents::Discard).unwrap());
    assert_eq!(atlas.size(), (8, 8));
    let data = read_texture(&ctx, &atlas.texture, 1).expect("readback");
    assert!(data.iter().all(|&b| b == 0));
}

const TRIM_SIDE: f64 = 32.0;
const HOLE: (f64, f64) = (10.0, 22.0);

/// 90 degree turns and the reflection across the y axis, row-major.
const ROT_0: [f64; 4] = [1.0, 0.0, 0.0, 1.0];
const ROT_90: [f64; 4] = [0.0, -1.0, 1.0, 0.0];
const ROT_270: [f64; 4] = [0.0, 1.0, -1.0, 0.0];
const MIRROR_X: [f64; 4] = [-1.0, 0.0, 0.0, 1.0];

fn line_ref(curve: u32, tr: (f64, f64), m: [f64; 4], flags: CurveRefFlags) -> TrimCurveRef {
    TrimCurveRef {
        curve: CurveId(curve),
        xfo: Xfo2::new(Vector2::new(tr.0, tr.1), m),
        flags,
    }
}

/// A `TRIM_SIDE` square with a square hole, all edges straight lines along x
/// placed by their transforms. The top edges are reflections. The perimeter runs
/// counter-clockwise; the hole is placed counter-clockwise but every ref is
/// reversed, so it runs clockwise.
fn square_with_hole() -> TrimSet {
    let (lo, hi) = HOLE;
    let side = TRIM_SIDE;
    let rev = CurveRefFlags::REVERSED;
    TrimSet {
        size: Vector2::new(side, side),
        perimeter: vec![
            line_ref(0, (0.0, 0.0), ROT_0, CurveRefFlags::empty()),
            line_ref(0, (side, 0.0), ROT_90, CurveRefFlags::empty()),
            line_ref(0, (side, side), MIRROR_X, CurveRefFlags::empty()),
            line_ref(0, (0.0, side), ROT_270, CurveRefFlags::empty()),
        ],
        holes: vec![vec![
            line_ref(1, (lo, lo), ROT_0, rev),
            line_ref(1, (hi, lo), ROT_90, rev),
            line_ref(1, (hi, hi), MIRROR_X, rev),
            line_ref(1, (lo, hi), ROT_270, rev),
        ]],
    }
}

/// One trimmed plane using `set` as trim set 0, plus the two edge curves.
fn trimmed_asset(set: &TrimSet) -> LibraryBuffers {
    let codec = FormatCodec::default();
    let mut curves = CurveLibraryBuilder::new(codec);
    let hole_side = HOLE.1 - HOLE.0;
    curves.push_curve(
        curve_dims(0.0, TRIM_SIDE as f32, CurveFlags::empty()),
        &CurveData::new((0.0, TRIM_SIDE), CurveGeometry::Line(Line)),
    );
    curves.push_curve(
        curve_dims(0.0, hole_side as f32, CurveFlags::empty()),
        &CurveData::new((0.0, hole_side), CurveGeometry::Line(Line)),
    );
    let (curve_toc, curve_texture) = curves.build();

    let mut surfaces = SurfaceLibraryBuilder::new(codec);
    surfaces.push_surface(
        SurfaceDims {
            trim_set: Some(TrimSetId(0)),
            ..dims((TRIM_SIDE as f32, TRIM_SIDE as f32), 0.0)
        },
        Box2::UNIT,
        &SurfaceParams::Plane,
    );
    let (surface_toc, surface_texture) = surfaces.build();

    let (body_toc, body_texture) = build_bodies(
        &codec,
        &[BodyDescriptor {
            bbox: Box3::new(Point3::ZERO, Point3::splat(TRIM_SIDE)),
            surfaces: vec![BodyItemRef {
                id: 0,
                xfo: Xfo::IDENTITY,
                color: None,
            }],
            curves: Vec::new(),
        }],
    );

    LibraryBuffers {
        curve_toc,
        curve_texture,
        surface_toc,
        surface_texture,
        trim_sets: build_trim_sets(&codec, 0.0, std::slice::from_ref(set)),
        body_toc,
        body_texture,
    }
}

/// Transformed endpoints of every straight edge of `set`, given each curve's length.
fn edges(set: &TrimSet, lengths: &[f64]) -> Vec<(Point2, Point2)> {
    set.perimeter
        .iter()
        .chain(set.holes.iter().flatten())
        .map(|r| {
            let len = lengths[r.curve.0 as usize];
            (r.xfo.transform_point(Point2::ZERO), r.xfo.transform_point(Point2::new(len, 0.0)))
        })
        .collect()
}

/// Even-odd crossing test.
fn inside(edges: &[(Point2, Point2)], p: Point2) -> bool {
    let mut odd = false;
    for &(a, b) in edges {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                odd = !odd;
            }
        }
    }
    odd
}

fn segment_distance(p: Point2, (a, b): (Point2, Point2)) -> f64 {
    let ab = b - a;
    let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
    (a + ab * t).distance(p)
}

/// The mask before strips: parity at texel centers, then outside texels with
/// at least five inside neighbours (clamped to the rect) are closed.
fn reference_mask(edges: &[(Point2, Point2)], side: usize) -> Vec<bool> {
    let raw: Vec<bool> = (0..side * side)
        .map(|i| inside(edges, Point2::new((i % side) as f64 + 0.5, (i / side) as f64 + 0.5)))
        .collect();
    let at = |x: i64, y: i64| raw[y.clamp(0, side as i64 - 1) as usize * side + x.clamp(0, side as i64 - 1) as usize];
    (0..side * side)
        .map(|i| {
            let (x, y) = ((i % side) as i64, (i / side) as i64);
            if raw[i] {
                return true;
            }
            let neighbours = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| (dx, dy) != (0, 0) && at(x + dx, y + dy))
                .count();
            neighbours >= 5
        })
        .collect()
}

#[test]
fn test_reference_mask_of_square_with_hole() {
    let set = square_with_hole();
    let edges = edges(&set, &[TRIM_SIDE, HOLE.1 - HOLE.0]);
    assert_eq!(edges[2], (Point2::new(TRIM_SIDE, TRIM_SIDE), Point2::new(0.0, TRIM_SIDE)));

    let side = TRIM_SIDE as usize;
    let mask = reference_mask(&edges, side);
    let at = |x: usize, y: usize| mask[y * side + x];
    assert!(at(0, 0) && at(31, 31) && at(9, 16) && at(22, 16));
    assert!(!at(10, 16) && !at(21, 16) && !at(16, 16));
    // hole corners have five inside neighbours and close
    assert!(at(10, 10) && at(21, 21));
}

#[test]
#[ignore = "requires GPU"]
fn test_trim_mask_matches_parity_reference() {
    let ctx = GpuContext::init_blocking().expect("gpu context");
    let set = square_with_hole();
    let mut request = LayoutRequest::new(trimmed_asset(&set), FormatVersion::latest());
    request.bounding_radius = TRIM_SIDE;
    request.generation = 1;
    let result = run_layout(request).expect("layout");
    assert_eq!(result.plan.trim_rects.len(), 1);
    assert_eq!(result.plan.trim_rects[0].fill, 0.0);

    let libs = GpuLibraries::upload(&ctx, &result.buffers).expect("upload");
    let mut renderer = AtlasRenderer::new(&ctx).expect("renderer");
    assert!(renderer.render(&ctx, &libs, &result.plan, result.generation).unwrap());

    let atlas = &renderer.atlases().trim_mask;
    let data = read_texture(&ctx, &atlas.texture, 1).expect("readback");
    let rect = result.plan.trim_atlas.rect(0).expect("laid out");
    assert_eq!((rect[2], rect[3]), (TRIM_SIDE as f32, TRIM_SIDE as f32));
    let (x0, y0) = (rect[0] as usize, rect[1] as usize);
    let width = atlas.width() as usize;
    let mask = |x: usize, y: usize| data[(y0 + y) * width + x0 + x];

    let edges = edges(&set, &[TRIM_SIDE, HOLE.1 - HOLE.0]);
    let side = TRIM_SIDE as usize;
    let reference = reference_mask(&edges, side);
    let reach = f64::from(ctx.config.strip_half_width) + 0.5;
    let mut checked = 0;
    for y in 0..side {
        for x in 0..side {
            let center = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            if edges.iter().any(|&e| segment_distance(center, e) <= reach) {
                continue;
            }
            let expected = if reference[y * side + x] { 255 } else { 0 };
            assert_eq!(mask(x, y), expected, "texel ({x}, {y})");
            checked += 1;
        }
    }
    assert!(checked > 100, "only {checked} texels away from the boundary");

    // strips: partial coverage that leans towards the trimmed surface on both
    // sides of every hole edge, mirrored and reversed ones included
    let (lo, hi) = (HOLE.0 as usize, HOLE.1 as usize);
    let mid = side / 2;
    let kept_then_cut = [
        ((mid, lo - 1), (mid, lo)),
        ((mid, hi), (mid, hi - 1)),
        ((lo - 1, mid), (lo, mid)),
        ((hi, mid), (hi - 1, mid)),
    ];
    for ((kx, ky), (cx, cy)) in kept_then_cut {
        let (kept, cut) = (mask(kx, ky), mask(cx, cy));
        assert!(kept > 128 && kept < 255, "({kx}, {ky}) = {kept}");
        assert!(cut > 0 && cut < 128, "({cx}, {cy}) = {cut}");
    }
    // the perimeter, including the reflected top edge
    for (x, y) in [(mid, 0), (mid, side - 1), (0, mid), (side - 1, mid)] {
        let v = mask(x, y);
        assert!(v > 128 && v < 255, "({x}, {y}) = {v}");
    }
}
