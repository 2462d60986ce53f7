//! Rectangular lattice maze.
//!
//! Every cell is bounded by four posts and four walls. Neighboring cells share the obstacles on
//! their common boundary: the maze owns all obstacles in one arena and cells refer to them by
//! [`ObstacleId`], so a wall hidden through one cell is hidden for its neighbor as well.
//!
//! Row 0 is the top row. World coordinates have x growing to the right and y growing upwards,
//! with the lower-left corner of the bottom-left post at the origin.

use thiserror::Error;
use tracing::debug;

use super::{Mouse, MouseConfig, Obstacle, Position, SensorId, SensorReadings};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct MazeConfig {
    pub rows: usize,
    pub cols: usize,
    pub wall_length: f64,
    pub wall_width: f64,
    pub post_size: f64,
}

impl MazeConfig {
    pub const CLASSIC_WALL_LENGTH: f64 = 166.37;
    pub const CLASSIC_WALL_WIDTH: f64 = 12.065;
    pub const CLASSIC_POST_SIZE: f64 = 12.065;

    pub const fn new(
        rows: usize,
        cols: usize,
        wall_length: f64,
        wall_width: f64,
        post_size: f64,
    ) -> Self {
        Self {
            rows,
            cols,
            wall_length,
            wall_width,
            post_size,
        }
    }

    /// Competition-sized walls and posts.
    pub const fn classic(rows: usize, cols: usize) -> Self {
        Self::new(
            rows,
            cols,
            Self::CLASSIC_WALL_LENGTH,
            Self::CLASSIC_WALL_WIDTH,
            Self::CLASSIC_POST_SIZE,
        )
    }

    /// Distance between neighboring posts, center to center.
    pub fn pitch(&self) -> f64 {
        self.post_size + self.wall_length
    }

    fn validate(&self) -> Result<(), MazeError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(MazeError::EmptyMaze {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for (name, value) in [
            ("wall_length", self.wall_length),
            ("wall_width", self.wall_width),
            ("post_size", self.post_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MazeError::InvalidSize { name, value });
            }
        }
        Ok(())
    }
}

/// Wall presence markers. Only the distinction between blank and non-blank matters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WallGrid(Vec<Vec<bool>>);

impl WallGrid {
    /// One string per row; a space is an open passage, anything else a wall.
    pub fn from_rows(rows: &[&str]) -> Self {
        Self(
            rows.iter()
                .map(|row| row.chars().map(|c| c != ' ').collect())
                .collect(),
        )
    }

    pub fn from_bools(rows: Vec<Vec<bool>>) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> usize {
        self.0.len()
    }

    pub fn is_present(&self, row: usize, col: usize) -> bool {
        self.0
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    fn row_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().map(Vec::len)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MazeError {
    #[error("maze must have at least one row and one column, got {rows}x{cols}")]
    EmptyMaze { rows: usize, cols: usize },
    #[error("{name} must be positive and finite, got {value}")]
    InvalidSize { name: &'static str, value: f64 },
    #[error("expected {expected} rows of vertical walls, found {found}")]
    VerticalWallRows { expected: usize, found: usize },
    #[error("expected {expected} vertical walls in row {row}, found {found}")]
    VerticalWallColumns {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("expected {expected} rows of horizontal walls, found {found}")]
    HorizontalWallRows { expected: usize, found: usize },
    #[error("expected {expected} horizontal walls in row {row}, found {found}")]
    HorizontalWallColumns {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cell ({row}, {col}) is outside the maze")]
    CellOutOfRange { row: usize, col: usize },
}

/// Stable handle of an obstacle in the maze's arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObstacleId(usize);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

impl CellIndex {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MazeCell {
    index: CellIndex,
    lower_left_post: ObstacleId,
    upper_left_post: ObstacleId,
    upper_right_post: ObstacleId,
    lower_right_post: ObstacleId,
    left_wall: ObstacleId,
    top_wall: ObstacleId,
    right_wall: ObstacleId,
    bottom_wall: ObstacleId,
}

impl MazeCell {
    pub fn index(&self) -> CellIndex {
        self.index
    }

    pub fn lower_left_post(&self) -> ObstacleId {
        self.lower_left_post
    }

    pub fn upper_left_post(&self) -> ObstacleId {
        self.upper_left_post
    }

    pub fn upper_right_post(&self) -> ObstacleId {
        self.upper_right_post
    }

    pub fn lower_right_post(&self) -> ObstacleId {
        self.lower_right_post
    }

    pub fn left_wall(&self) -> ObstacleId {
        self.left_wall
    }

    pub fn top_wall(&self) -> ObstacleId {
        self.top_wall
    }

    pub fn right_wall(&self) -> ObstacleId {
        self.right_wall
    }

    pub fn bottom_wall(&self) -> ObstacleId {
        self.bottom_wall
    }

    pub fn posts(&self) -> [ObstacleId; 4] {
        [
            self.lower_left_post,
            self.upper_left_post,
            self.upper_right_post,
            self.lower_right_post,
        ]
    }

    pub fn walls(&self) -> [ObstacleId; 4] {
        [self.left_wall, self.top_wall, self.right_wall, self.bottom_wall]
    }

    pub fn obstacles(&self) -> [ObstacleId; 8] {
        let [a, b, c, d] = self.posts();
        let [e, f, g, h] = self.walls();
        [a, b, c, d, e, f, g, h]
    }
}

pub struct MazeBuilder {
    config: MazeConfig,
    vertical: WallGrid,
    horizontal: WallGrid,
    mouse_config: MouseConfig,
}

impl MazeBuilder {
    /// `vertical` has `rows` rows of `cols + 1` entries (left to right, including both outer
    /// walls), `horizontal` has `rows + 1` rows of `cols` entries (top to bottom).
    pub fn new(config: MazeConfig, vertical: WallGrid, horizontal: WallGrid) -> Self {
        Self {
            config,
            vertical,
            horizontal,
            mouse_config: MouseConfig::default(),
        }
    }

    pub fn with_mouse_config(mut self, mouse_config: MouseConfig) -> Self {
        self.mouse_config = mouse_config;
        self
    }

    pub fn build(self) -> Result<Maze, MazeError> {
        self.validate()?;

        let lattice = Lattice(self.config);
        let (rows, cols) = (self.config.rows, self.config.cols);
        let posts = (rows + 1) * (cols + 1);
        let walls = rows * (cols + 1) + (rows + 1) * cols;
        let mut obstacles = Vec::with_capacity(posts + walls);
        let mut cells: Vec<MazeCell> = Vec::with_capacity(rows * cols);

        let mut allocate = |obstacle: Obstacle| {
            obstacles.push(obstacle);
            ObstacleId(obstacles.len() - 1)
        };

        for row in 0..rows {
            for col in 0..cols {
                let left = (col > 0).then(|| cells[row * cols + col - 1]);
                let top = (row > 0).then(|| cells[(row - 1) * cols + col]);

                let lower_left_post = match left {
                    Some(left) => left.lower_right_post,
                    None => allocate(lattice.post(row + 1, col)),
                };
                let upper_left_post = match (top, left) {
                    (Some(top), _) => top.lower_left_post,
                    (None, Some(left)) => left.upper_right_post,
                    (None, None) => allocate(lattice.post(row, col)),
                };
                let upper_right_post = match top {
                    Some(top) => top.lower_right_post,
                    None => allocate(lattice.post(row, col + 1)),
                };
                let lower_right_post = allocate(lattice.post(row + 1, col + 1));
                let left_wall = match left {
                    Some(left) => left.right_wall,
                    None => allocate(lattice.vertical_wall(row, col)),
                };
                let top_wall = match top {
                    Some(top) => top.bottom_wall,
                    None => allocate(lattice.horizontal_wall(row, col)),
                };
                let right_wall = allocate(lattice.vertical_wall(row, col + 1));
                let bottom_wall = allocate(lattice.horizontal_wall(row + 1, col));

                cells.push(MazeCell {
                    index: CellIndex::new(row, col),
                    lower_left_post,
                    upper_left_post,
                    upper_right_post,
                    lower_right_post,
                    left_wall,
                    top_wall,
                    right_wall,
                    bottom_wall,
                });
            }
        }

        for cell in &cells {
            let CellIndex { row, col } = cell.index;
            for post in cell.posts() {
                obstacles[post.0].set_visible();
            }
            for (wall, present) in [
                (cell.left_wall, self.vertical.is_present(row, col)),
                (cell.top_wall, self.horizontal.is_present(row, col)),
                (cell.right_wall, self.vertical.is_present(row, col + 1)),
                (cell.bottom_wall, self.horizontal.is_present(row + 1, col)),
            ] {
                if present {
                    obstacles[wall.0].set_visible();
                }
            }
        }

        debug!(
            rows,
            cols,
            obstacles = obstacles.len(),
            visible = obstacles.iter().filter(|o| o.is_visible()).count(),
            "maze built"
        );

        let mouse = Mouse::new(lattice.cell_center(rows - 1, 0), self.mouse_config);
        Ok(Maze {
            config: self.config,
            obstacles,
            cells,
            mouse,
        })
    }

    fn validate(&self) -> Result<(), MazeError> {
        self.config.validate()?;
        let (rows, cols) = (self.config.rows, self.config.cols);

        if self.vertical.rows() != rows {
            return Err(MazeError::VerticalWallRows {
                expected: rows,
                found: self.vertical.rows(),
            });
        }
        if let Some((row, found)) = self
            .vertical
            .row_lengths()
            .enumerate()
            .find(|(_, len)| *len != cols + 1)
        {
            return Err(MazeError::VerticalWallColumns {
                row,
                expected: cols + 1,
                found,
            });
        }
        if self.horizontal.rows() != rows + 1 {
            return Err(MazeError::HorizontalWallRows {
                expected: rows + 1,
                found: self.horizontal.rows(),
            });
        }
        if let Some((row, found)) = self
            .horizontal
            .row_lengths()
            .enumerate()
            .find(|(_, len)| *len != cols)
        {
            return Err(MazeError::HorizontalWallColumns {
                row,
                expected: cols,
                found,
            });
        }
        Ok(())
    }
}

/// Closed-form obstacle placement. Lattice rows and columns count post lines, so a maze of
/// `rows` cells has `rows + 1` post rows, numbered from the top.
struct Lattice(MazeConfig);

impl Lattice {
    /// y of the lower edge of post line `row`.
    fn base_y(&self, row: usize) -> f64 {
        (self.0.rows - row) as f64 * self.0.pitch()
    }

    fn base_x(&self, col: usize) -> f64 {
        col as f64 * self.0.pitch()
    }

    fn post(&self, row: usize, col: usize) -> Obstacle {
        let half = self.0.post_size / 2.0;
        Obstacle::post(
            Position::new(self.base_x(col) + half, self.base_y(row) + half),
            self.0.post_size,
        )
    }

    /// Wall along the top of post line `row`, between post columns `col` and `col + 1`.
    fn horizontal_wall(&self, row: usize, col: usize) -> Obstacle {
        let MazeConfig {
            wall_length,
            wall_width,
            post_size,
            ..
        } = self.0;
        Obstacle::wall(
            Position::new(
                post_size + self.base_x(col) + wall_length / 2.0,
                self.base_y(row) + wall_width / 2.0,
            ),
            wall_length,
            wall_width,
        )
    }

    /// Wall to the left of cell column `col` in cell row `row`.
    fn vertical_wall(&self, row: usize, col: usize) -> Obstacle {
        let MazeConfig {
            wall_length,
            wall_width,
            post_size,
            ..
        } = self.0;
        Obstacle::wall(
            Position::new(
                self.base_x(col) + wall_width / 2.0,
                post_size + self.base_y(row + 1) + wall_length / 2.0,
            ),
            wall_width,
            wall_length,
        )
    }

    fn cell_center(&self, row: usize, col: usize) -> Position {
        let MazeConfig {
            wall_length,
            post_size,
            ..
        } = self.0;
        Position::new(
            post_size + self.base_x(col) + wall_length / 2.0,
            post_size + self.base_y(row + 1) + wall_length / 2.0,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Maze {
    config: MazeConfig,
    obstacles: Vec<Obstacle>,
    cells: Vec<MazeCell>,
    mouse: Mouse,
}

impl Maze {
    pub fn new(
        config: MazeConfig,
        vertical: WallGrid,
        horizontal: WallGrid,
    ) -> Result<Self, MazeError> {
        MazeBuilder::new(config, vertical, horizontal).build()
    }

    pub fn config(&self) -> &MazeConfig {
        &self.config
    }

    pub fn rows(&self) -> usize {
        self.config.rows
    }

    pub fn cols(&self) -> usize {
        self.config.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&MazeCell> {
        if row < self.rows() && col < self.cols() {
            self.cells.get(row * self.cols() + col)
        } else {
            None
        }
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &MazeCell> {
        self.cells.iter()
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0)
    }

    pub fn obstacle_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.obstacles.get_mut(id.0)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles
            .iter()
            .enumerate()
            .map(|(i, o)| (ObstacleId(i), o))
    }

    pub fn visible_obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter().filter(|o| o.is_visible())
    }

    pub fn mouse(&self) -> &Mouse {
        &self.mouse
    }

    pub fn mouse_mut(&mut self) -> &mut Mouse {
        &mut self.mouse
    }

    pub fn set_mouse(&mut self, mouse: Mouse) {
        self.mouse = mouse;
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Result<Position, MazeError> {
        if row < self.rows() && col < self.cols() {
            Ok(Lattice(self.config).cell_center(row, col))
        } else {
            Err(MazeError::CellOutOfRange { row, col })
        }
    }

    /// Replace the mouse with a fresh one, heading 0, at the center of the given cell.
    pub fn move_mouse(&mut self, row: usize, col: usize) -> Result<(), MazeError> {
        let center = self.cell_center(row, col)?;
        self.mouse = Mouse::new(center, self.mouse.config().clone());
        Ok(())
    }

    /// Inclusive test against the area spanned by the cell's posts.
    pub fn cell_contains(&self, cell: &MazeCell, position: Position) -> bool {
        let (Some(lower_left), Some(upper_left), Some(upper_right)) = (
            self.obstacle(cell.lower_left_post),
            self.obstacle(cell.upper_left_post),
            self.obstacle(cell.upper_right_post),
        ) else {
            return false;
        };

        position.x() >= upper_left.upper_left_corner().x()
            && position.x() <= upper_right.upper_right_corner().x()
            && position.y() >= lower_left.lower_left_corner().y()
            && position.y() <= upper_left.upper_left_corner().y()
    }

    /// First cell in row-major order containing the mouse's center.
    pub fn find_mouse_cell(&self) -> Option<CellIndex> {
        let position = self.mouse.position();
        self.cells
            .iter()
            .find(|cell| self.cell_contains(cell, position))
            .map(MazeCell::index)
    }

    /// The cell and its existing neighbors, without wrapping around the border.
    pub fn neighborhood(&self, index: CellIndex) -> impl Iterator<Item = &MazeCell> {
        let rows = index.row.saturating_sub(1)..=(index.row + 1).min(self.rows() - 1);
        let cols = index.col.saturating_sub(1)..=(index.col + 1).min(self.cols() - 1);
        rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
            .filter_map(move |(row, col)| self.cell(row, col))
    }

    /// Nearest visible surface around the mouse for every sensor. All sensors are absent when the
    /// mouse is outside the maze.
    pub fn sensor_distances(&self) -> SensorReadings {
        let Some(index) = self.find_mouse_cell() else {
            return SensorReadings::default();
        };

        let mut ids = self
            .neighborhood(index)
            .flat_map(|cell| cell.obstacles())
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        let obstacles = ids
            .into_iter()
            .filter_map(|id| self.obstacle(id))
            .filter(|o| o.is_visible())
            .collect::<Vec<_>>();

        SensorReadings::from_fn(|sensor| self.nearest_hit(sensor, &obstacles))
    }

    fn nearest_hit(&self, sensor: SensorId, obstacles: &[&Obstacle]) -> Option<f64> {
        let ray = self.mouse.sensor_ray(sensor);
        obstacles
            .iter()
            .flat_map(|o| o.edges())
            .filter_map(|edge| ray.distance_to(&edge))
            .min_by(|a, b| a.total_cmp(b))
    }
}
