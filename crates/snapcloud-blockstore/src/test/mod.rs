mod assembler;
mod window;
