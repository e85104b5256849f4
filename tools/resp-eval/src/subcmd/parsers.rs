use resp_berry::displacement::OrderBy;
use resp_berry::record::CoordAxis;

/// 解析 `phase`, `numeric` 或 `auto`.
pub fn order_by_valid(s: &str) -> Result<OrderBy, String> {
    OrderBy::parse(s).ok_or_else(|| format!("`{s}` 不是 phase, numeric 或 auto"))
}

/// 解析 `x`, `y` 或 `z`.
pub fn coord_axis_valid(s: &str) -> Result<CoordAxis, String> {
    CoordAxis::parse(s).ok_or_else(|| format!("`{s}` 不是 x, y 或 z"))
}
