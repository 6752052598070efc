use arrow::{
    array::{ArrayBuilder, PrimitiveBuilder, StructArray},
    datatypes::{DataType, Field, Float64Type, UInt64Type},
};

use crate::model::Params;

/// Collects draws into arrow columns.
pub struct TraceBuilder {
    draw: PrimitiveBuilder<UInt64Type>,
    floor: PrimitiveBuilder<Float64Type>,
    ceiling: PrimitiveBuilder<Float64Type>,
    ec50: PrimitiveBuilder<Float64Type>,
    slope: PrimitiveBuilder<Float64Type>,
}

impl Default for TraceBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl TraceBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        TraceBuilder {
            draw: PrimitiveBuilder::with_capacity(capacity),
            floor: PrimitiveBuilder::with_capacity(capacity),
            ceiling: PrimitiveBuilder::with_capacity(capacity),
            ec50: PrimitiveBuilder::with_capacity(capacity),
            slope: PrimitiveBuilder::with_capacity(capacity),
        }
    }

    pub fn append_value(&mut self, value: &Params) {
        let draw = self.draw.len() as u64;
        self.draw.append_value(draw);
        self.floor.append_value(value.floor);
        self.ceiling.append_value(value.ceiling);
        self.ec50.append_value(value.ec50);
        self.slope.append_value(value.slope);
    }

    pub fn len(&self) -> usize {
        self.draw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finalize(self) -> StructArray {
        let Self {
            mut draw,
            mut floor,
            mut ceiling,
            mut ec50,
            mut slope,
        } = self;

        let arrays = vec![
            ArrayBuilder::finish(&mut draw),
            ArrayBuilder::finish(&mut floor),
            ArrayBuilder::finish(&mut ceiling),
            ArrayBuilder::finish(&mut ec50),
            ArrayBuilder::finish(&mut slope),
        ];

        StructArray::new(fields().into(), arrays, None)
    }

    pub fn inspect(&self) -> StructArray {
        let arrays = vec![
            ArrayBuilder::finish_cloned(&self.draw),
            ArrayBuilder::finish_cloned(&self.floor),
            ArrayBuilder::finish_cloned(&self.ceiling),
            ArrayBuilder::finish_cloned(&self.ec50),
            ArrayBuilder::finish_cloned(&self.slope),
        ];

        StructArray::new(fields().into(), arrays, None)
    }
}

fn fields() -> Vec<Field> {
    vec![
        Field::new("draw", DataType::UInt64, false),
        Field::new("floor", DataType::Float64, false),
        Field::new("ceiling", DataType::Float64, false),
        Field::new("ec50", DataType::Float64, false),
        Field::new("slope", DataType::Float64, false),
    ]
}
