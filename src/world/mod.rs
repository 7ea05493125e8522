mod builder;
mod camera;
mod geometry;
mod light;
mod queries;
mod texture;

pub use geometry::{
    LevelError, MIN_SECTOR_HEADROOM, MovableFloor, PlayerStart, Sector, SectorId, SectorToggle,
    Vertex, VertexId, Wall, WallFlags, WallId, World,
};

pub use builder::WorldBuilder;
pub use camera::Camera;
pub use light::{LightColor, PointLight};
pub use queries::{
    SectorTracker, closest_point_on_segment, ray_segment_hit, segment_intersect_param,
    segment_param, side_of,
};

pub use texture::{NO_TEXTURE, Texture, TextureBank, TextureError, TextureId};
