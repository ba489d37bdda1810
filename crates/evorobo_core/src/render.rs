//! Top-down SVG rendering of a developed body.

use evorobo_data::{Body, ModuleKind};
use std::fmt::Write;

const CELL: i32 = 40;
const MARGIN: i32 = 20;

fn fill(kind: ModuleKind, rotated: bool) -> &'static str {
    match (kind, rotated) {
        (ModuleKind::Core, _) => "#f2c14e",
        (ModuleKind::Brick, _) => "#4e79a7",
        (ModuleKind::ActiveHinge, false) => "#e15759",
        (ModuleKind::ActiveHinge, true) => "#9c2f31",
    }
}

/// Renders the body seen from above; higher layers are drawn over lower ones.
#[must_use]
pub fn render_body_svg(body: &Body) -> String {
    let (min, max) = body.grid_extents();
    let width = (max[0] - min[0] + 1) * CELL + 2 * MARGIN;
    let height = (max[1] - min[1] + 1) * CELL + 2 * MARGIN;
    // SVG y grows downward, grid y grows forward.
    let centre = |grid: [i32; 3]| {
        (
            MARGIN + (grid[0] - min[0]) * CELL + CELL / 2,
            MARGIN + (max[1] - grid[1]) * CELL + CELL / 2,
        )
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);

    for module in &body.modules {
        if let Some(parent) = module.parent {
            let (x1, y1) = centre(body.modules[parent].grid);
            let (x2, y2) = centre(module.grid);
            let _ = writeln!(
                svg,
                r#"  <line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="black" stroke-width="2"/>"#
            );
        }
    }

    let mut order: Vec<usize> = (0..body.modules.len()).collect();
    order.sort_by_key(|&idx| body.modules[idx].grid[2]);
    for idx in order {
        let module = &body.modules[idx];
        let (cx, cy) = centre(module.grid);
        let size = match module.kind {
            ModuleKind::Core => CELL - 4,
            ModuleKind::Brick => CELL - 10,
            ModuleKind::ActiveHinge => CELL - 18,
        };
        let _ = writeln!(
            svg,
            r#"  <rect x="{}" y="{}" width="{size}" height="{size}" fill="{}" stroke="black" data-module="{idx}" data-z="{}"/>"#,
            cx - size / 2,
            cy - size / 2,
            fill(module.kind, module.rotated),
            module.grid[2],
        );
    }
    svg.push_str("</svg>\n");
    svg
}
