pub mod formatter;

pub use formatter::{
    format_breakdown, format_city_summary, format_house_detail, format_house_list,
    format_property, format_property_list, should_use_colors,
};
